//! AdaBoost.MH multiclass boosting
//!
//! Based on "Improved Boosting Algorithms Using Confidence-rated Predictions"
//! by Schapire and Singer

pub mod boost;
pub mod decision_stump;
pub mod model;
pub mod perceptron;
pub mod weak_learner;

pub use boost::AdaBoost;
pub use decision_stump::{DecisionStump, Split};
pub use model::{AdaBoostModel, Ensemble};
pub use perceptron::Perceptron;
pub use weak_learner::WeakLearner;
