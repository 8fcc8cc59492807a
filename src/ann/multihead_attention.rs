//! Multi-head scaled dot-product attention
//!
//! Every input column stacks the query, key and value sequences:
//!
//! ```text
//! [ query (embed * tgt) ; key (embed * src) ; value (embed * src) ]
//! ```
//!
//! Each block is token-major, token `t` occupying rows
//! `t * embed .. (t + 1) * embed`. The output column holds the attended
//! target sequence in the same layout.
//!
//! The parameter buffer is `W_q, W_k, W_v, W_o` (each `embed x embed`,
//! row-major) followed by `b_q, b_k, b_v, b_o`.

use crate::ann::Layer;
use crate::core::error::check_dim;
use crate::core::{Matrix, MlError, Result, Vector};
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};

const QUERY: usize = 0;
const KEY: usize = 1;
const VALUE: usize = 2;
const OUTPUT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiheadAttention {
    tgt_seq_len: usize,
    src_seq_len: usize,
    embed_dim: usize,
    num_heads: usize,
    weights: Vec<f64>,
    attn_mask: Option<Matrix>,
    key_padding_mask: Option<Matrix>,
}

/// Forward intermediates of one batch column
struct Attended {
    query: Matrix,
    key: Matrix,
    value: Matrix,
    /// Projected queries, already scaled by `1/√head_dim`
    q: Matrix,
    k: Matrix,
    v: Matrix,
    /// Per-head `tgt x src` attention weights
    attention: Vec<Matrix>,
    /// Concatenated head outputs before the output projection
    heads: Matrix,
    output: Matrix,
}

impl MultiheadAttention {
    /// Layer with all parameters zero and no masks
    pub fn new(
        tgt_seq_len: usize,
        src_seq_len: usize,
        embed_dim: usize,
        num_heads: usize,
    ) -> Result<Self> {
        if num_heads == 0 || embed_dim == 0 || embed_dim % num_heads != 0 {
            return Err(MlError::InvalidParameter(format!(
                "Embedding dimension {embed_dim} must be a positive multiple of the number of heads {num_heads}"
            )));
        }
        if tgt_seq_len == 0 || src_seq_len == 0 {
            return Err(MlError::InvalidParameter(
                "Sequence lengths must be positive".to_string(),
            ));
        }

        Ok(Self {
            tgt_seq_len,
            src_seq_len,
            embed_dim,
            num_heads,
            weights: vec![0.0; 4 * embed_dim * embed_dim + 4 * embed_dim],
            attn_mask: None,
            key_padding_mask: None,
        })
    }

    /// Additive `tgt x src` mask applied to every head's scores
    pub fn with_attention_mask(mut self, mask: Matrix) -> Result<Self> {
        if mask.dim() != (self.tgt_seq_len, self.src_seq_len) {
            return Err(MlError::InvalidParameter(format!(
                "Attention mask must be {}x{}, got {}x{}",
                self.tgt_seq_len,
                self.src_seq_len,
                mask.nrows(),
                mask.ncols()
            )));
        }
        self.attn_mask = Some(finite_mask(mask, "Attention mask")?);
        Ok(self)
    }

    /// Additive `1 x src` mask applied to every query position
    pub fn with_key_padding_mask(mut self, mask: Matrix) -> Result<Self> {
        if mask.dim() != (1, self.src_seq_len) {
            return Err(MlError::InvalidParameter(format!(
                "Key padding mask must be 1x{}, got {}x{}",
                self.src_seq_len,
                mask.nrows(),
                mask.ncols()
            )));
        }
        self.key_padding_mask = Some(finite_mask(mask, "Key padding mask")?);
        Ok(self)
    }

    pub fn tgt_seq_len(&self) -> usize {
        self.tgt_seq_len
    }

    pub fn src_seq_len(&self) -> usize {
        self.src_seq_len
    }

    pub fn embed_dim(&self) -> usize {
        self.embed_dim
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn head_dim(&self) -> usize {
        self.embed_dim / self.num_heads
    }

    pub fn attention_mask(&self) -> Option<&Matrix> {
        self.attn_mask.as_ref()
    }

    pub fn key_padding_mask(&self) -> Option<&Matrix> {
        self.key_padding_mask.as_ref()
    }

    /// Per-head `tgt x src` attention weights for one input column
    pub fn attention_weights(&self, column: ArrayView1<'_, f64>) -> Result<Vec<Matrix>> {
        check_dim(self.input_size(), column.len())?;
        Ok(self.attend(column)?.attention)
    }

    fn projection(&self, index: usize) -> Result<ArrayView2<'_, f64>> {
        let size = self.embed_dim * self.embed_dim;
        let start = index * size;
        Ok(ArrayView2::from_shape(
            (self.embed_dim, self.embed_dim),
            &self.weights[start..start + size],
        )?)
    }

    fn bias(&self, index: usize) -> ArrayView1<'_, f64> {
        let start = 4 * self.embed_dim * self.embed_dim + index * self.embed_dim;
        ArrayView1::from(&self.weights[start..start + self.embed_dim])
    }

    fn project(&self, index: usize, x: &Matrix) -> Result<Matrix> {
        let mut projected = self.projection(index)?.dot(x);
        projected += &self.bias(index).insert_axis(Axis(1));
        Ok(projected)
    }

    /// Sum of both masks, `None` when neither is set
    fn combined_mask(&self) -> Option<Matrix> {
        if self.attn_mask.is_none() && self.key_padding_mask.is_none() {
            return None;
        }
        Some(Array2::from_shape_fn(
            (self.tgt_seq_len, self.src_seq_len),
            |(i, j)| {
                self.attn_mask.as_ref().map_or(0.0, |m| m[[i, j]])
                    + self.key_padding_mask.as_ref().map_or(0.0, |m| m[[0, j]])
            },
        ))
    }

    fn attend(&self, column: ArrayView1<'_, f64>) -> Result<Attended> {
        let e = self.embed_dim;
        let d = self.head_dim();
        let (tgt, src) = (self.tgt_seq_len, self.src_seq_len);

        let query = tokens(column.slice(s![..e * tgt]), e);
        let key = tokens(column.slice(s![e * tgt..e * (tgt + src)]), e);
        let value = tokens(column.slice(s![e * (tgt + src)..]), e);

        let scale = 1.0 / (d as f64).sqrt();
        let q = self.project(QUERY, &query)? * scale;
        let k = self.project(KEY, &key)?;
        let v = self.project(VALUE, &value)?;

        let mask = self.combined_mask();
        let mut heads = Array2::<f64>::zeros((e, tgt));
        let mut attention = Vec::with_capacity(self.num_heads);
        for head in 0..self.num_heads {
            let (lo, hi) = (head * d, (head + 1) * d);
            let scores = q.slice(s![lo..hi, ..]).t().dot(&k.slice(s![lo..hi, ..]));
            let weights = masked_softmax(scores, mask.as_ref());
            heads
                .slice_mut(s![lo..hi, ..])
                .assign(&v.slice(s![lo..hi, ..]).dot(&weights.t()));
            attention.push(weights);
        }

        let output = self.project(OUTPUT, &heads)?;
        Ok(Attended {
            query,
            key,
            value,
            q,
            k,
            v,
            attention,
            heads,
            output,
        })
    }

    /// Input gradient of one column; parameter gradients are accumulated
    /// into `gradient` when given
    fn backpropagate(
        &self,
        column: ArrayView1<'_, f64>,
        dy: ArrayView1<'_, f64>,
        gradient: Option<&mut [f64]>,
    ) -> Result<Vector> {
        let e = self.embed_dim;
        let d = self.head_dim();
        let (tgt, src) = (self.tgt_seq_len, self.src_seq_len);
        let scale = 1.0 / (d as f64).sqrt();

        let fwd = self.attend(column)?;
        let dy = tokens(dy, e);
        let d_heads = self.projection(OUTPUT)?.t().dot(&dy);

        let mut dq = Array2::<f64>::zeros((e, tgt));
        let mut dk = Array2::<f64>::zeros((e, src));
        let mut dv = Array2::<f64>::zeros((e, src));
        for (head, weights) in fwd.attention.iter().enumerate() {
            let (lo, hi) = (head * d, (head + 1) * d);
            let d_out = d_heads.slice(s![lo..hi, ..]);

            dv.slice_mut(s![lo..hi, ..]).assign(&d_out.dot(weights));
            let d_weights = d_out.t().dot(&fwd.v.slice(s![lo..hi, ..]));
            let d_scores = softmax_backward(weights, &d_weights);

            dq.slice_mut(s![lo..hi, ..])
                .assign(&(fwd.k.slice(s![lo..hi, ..]).dot(&d_scores.t()) * scale));
            dk.slice_mut(s![lo..hi, ..])
                .assign(&fwd.q.slice(s![lo..hi, ..]).dot(&d_scores));
        }

        if let Some(g) = gradient {
            self.accumulate(g, QUERY, &dq, &fwd.query);
            self.accumulate(g, KEY, &dk, &fwd.key);
            self.accumulate(g, VALUE, &dv, &fwd.value);
            self.accumulate(g, OUTPUT, &dy, &fwd.heads);
        }

        let mut dx = Array1::<f64>::zeros(self.input_size());
        flatten_into(
            self.projection(QUERY)?.t().dot(&dq).view(),
            dx.slice_mut(s![..e * tgt]),
        );
        flatten_into(
            self.projection(KEY)?.t().dot(&dk).view(),
            dx.slice_mut(s![e * tgt..e * (tgt + src)]),
        );
        flatten_into(
            self.projection(VALUE)?.t().dot(&dv).view(),
            dx.slice_mut(s![e * (tgt + src)..]),
        );
        Ok(dx)
    }

    /// Adds `delta · xᵀ` and the row sums of `delta` to the weights and bias
    /// of projection `index`
    fn accumulate(&self, gradient: &mut [f64], index: usize, delta: &Matrix, x: &Matrix) {
        let size = self.embed_dim * self.embed_dim;
        let start = index * size;
        for (g, dw) in gradient[start..start + size]
            .iter_mut()
            .zip(delta.dot(&x.t()).iter())
        {
            *g += dw;
        }

        let start = 4 * size + index * self.embed_dim;
        for (g, db) in gradient[start..start + self.embed_dim]
            .iter_mut()
            .zip(delta.sum_axis(Axis(1)).iter())
        {
            *g += db;
        }
    }
}

/// Token-major block to an `embed x len` matrix
fn tokens(block: ArrayView1<'_, f64>, embed: usize) -> Matrix {
    let len = block.len() / embed;
    Array2::from_shape_fn((embed, len), |(i, t)| block[t * embed + i])
}

fn flatten_into(m: ArrayView2<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
    let embed = m.nrows();
    for ((i, t), &x) in m.indexed_iter() {
        out[t * embed + i] = x;
    }
}

/// Stores `-inf` entries as `f64::MIN` so the mask survives JSON; NaN and
/// `+inf` are rejected
fn finite_mask(mut mask: Matrix, what: &str) -> Result<Matrix> {
    if let Some(bad) = mask.iter().find(|v| v.is_nan() || **v == f64::INFINITY) {
        return Err(MlError::InvalidParameter(format!(
            "{what} entries must be finite or -inf, got {bad}"
        )));
    }
    mask.mapv_inplace(|v| if v == f64::NEG_INFINITY { f64::MIN } else { v });
    Ok(mask)
}

fn is_blocked(mask: f64) -> bool {
    mask <= f64::MIN / 2.0
}

/// Row-wise softmax of `scores + mask`; blocked entries get zero weight and a
/// fully blocked row is all zeros
fn masked_softmax(mut scores: Matrix, mask: Option<&Matrix>) -> Matrix {
    for (i, mut row) in scores.axis_iter_mut(Axis(0)).enumerate() {
        let blocked = |j: usize| mask.is_some_and(|m| is_blocked(m[[i, j]]));
        if let Some(m) = mask {
            for j in 0..row.len() {
                if !blocked(j) {
                    row[j] += m[[i, j]];
                }
            }
        }

        let max = (0..row.len())
            .filter(|&j| !blocked(j))
            .map(|j| row[j])
            .fold(f64::NEG_INFINITY, f64::max);
        if max == f64::NEG_INFINITY {
            row.fill(0.0);
            continue;
        }

        let mut total = 0.0;
        for j in 0..row.len() {
            let w = if blocked(j) { 0.0 } else { (row[j] - max).exp() };
            row[j] = w;
            total += w;
        }
        row /= total;
    }
    scores
}

/// `A ⊙ (dA - rowsum(dA ⊙ A))`
fn softmax_backward(weights: &Matrix, d_weights: &Matrix) -> Matrix {
    let dots = (weights * d_weights).sum_axis(Axis(1)).insert_axis(Axis(1));
    weights * &(d_weights - &dots)
}

impl Layer for MultiheadAttention {
    fn weight_size(&self) -> usize {
        4 * self.embed_dim * self.embed_dim + 4 * self.embed_dim
    }

    fn input_size(&self) -> usize {
        self.embed_dim * (self.tgt_seq_len + 2 * self.src_seq_len)
    }

    fn output_size(&self) -> usize {
        self.embed_dim * self.tgt_seq_len
    }

    fn parameters(&self) -> &[f64] {
        &self.weights
    }

    fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        check_dim(self.weight_size(), weights.len())?;
        self.weights.copy_from_slice(weights);
        Ok(())
    }

    fn forward(&self, input: ArrayView2<'_, f64>) -> Result<Matrix> {
        check_dim(self.input_size(), input.nrows())?;
        let mut output = Array2::<f64>::zeros((self.output_size(), input.ncols()));
        for (j, column) in input.axis_iter(Axis(1)).enumerate() {
            let attended = self.attend(column)?;
            flatten_into(attended.output.view(), output.column_mut(j));
        }
        Ok(output)
    }

    fn backward(
        &self,
        input: ArrayView2<'_, f64>,
        _output: ArrayView2<'_, f64>,
        gy: ArrayView2<'_, f64>,
    ) -> Result<Matrix> {
        check_dim(self.input_size(), input.nrows())?;
        check_dim(self.output_size(), gy.nrows())?;
        check_dim(input.ncols(), gy.ncols())?;

        let mut g = Array2::<f64>::zeros(input.raw_dim());
        for (j, (column, dy)) in input
            .axis_iter(Axis(1))
            .zip(gy.axis_iter(Axis(1)))
            .enumerate()
        {
            g.column_mut(j).assign(&self.backpropagate(column, dy, None)?);
        }
        Ok(g)
    }

    fn gradient(&self, input: ArrayView2<'_, f64>, error: ArrayView2<'_, f64>) -> Result<Vector> {
        check_dim(self.input_size(), input.nrows())?;
        check_dim(self.output_size(), error.nrows())?;
        check_dim(input.ncols(), error.ncols())?;

        let mut gradient = vec![0.0; self.weight_size()];
        for (column, dy) in input.axis_iter(Axis(1)).zip(error.axis_iter(Axis(1))) {
            self.backpropagate(column, dy, Some(&mut gradient))?;
        }
        Ok(Array1::from(gradient))
    }
}
