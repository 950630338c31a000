/// Swap storage order: `dst` holds `src` with its major and minor axes exchanged.
///
/// Reading a `rows × cols` row-major buffer and writing it this way yields
/// the column-major buffer of the same matrix (and vice versa with the
/// dimensions swapped). [`Matrix::to_layout`](super::Matrix::to_layout) is
/// built on this.
///
/// # Arguments
///
/// * `src` - `rows` runs of `cols` contiguous samples
/// * `dst` - `cols` runs of `rows` contiguous samples
/// * `rows` - Number of runs in `src`
/// * `cols` - Length of each run in `src`
///
/// # Panics
///
/// If either buffer does not hold `rows * cols` samples.
///
/// # Example
///
/// ```
/// use aie_gemm::matrix::transpose::transpose;
///
/// let row_major = [1i16, 2, 3,
///                  4, 5, 6];
/// let mut col_major = [0i16; 6];
///
/// transpose(&row_major, &mut col_major, 2, 3);
///
/// assert_eq!(col_major, [1, 4, 2, 5, 3, 6]);
/// ```
pub fn transpose<T: Copy>(src: &[T], dst: &mut [T], rows: usize, cols: usize) {
    assert_eq!(
        src.len(),
        rows * cols,
        "src: expected {}x{} elements",
        rows,
        cols
    );
    assert_eq!(
        dst.len(),
        rows * cols,
        "dst: expected {}x{} elements",
        cols,
        rows
    );
    for (i, run) in src.chunks_exact(cols).enumerate() {
        for (j, &v) in run.iter().enumerate() {
            dst[j * rows + i] = v;
        }
    }
}
