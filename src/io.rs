// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use ndarray::{Array2, ArrayD, ArrayView2, Ix2, ShapeBuilder};

use crate::core::{ArrivalTimeField, SlownessField};
use crate::error::{EikonalError, Result};
use crate::raytrace::RayPath;

/// Supported file formats for grid I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(EikonalError::UnsupportedFileFormat(ext.to_string())),
        None => Err(EikonalError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

fn require_2d(shape: &[usize]) -> Result<[usize; 2]> {
    match *shape {
        [rows, cols] => Ok([rows, cols]),
        _ => Err(EikonalError::Other(format!(
            "expected a 2-D array, got shape {:?}",
            shape
        ))),
    }
}

/// Read a 2-D array from a .npy file, promoting f32 to f64.
///
/// Fortran-ordered files come back in logical (row, col) order.
pub fn read_npy_2d(path: &Path) -> Result<Array2<f64>> {
    let arr: ArrayD<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: ArrayD<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| EikonalError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(f64::from)
        }
    };
    require_2d(arr.shape())?;
    arr.into_dimensionality::<Ix2>()
        .map_err(|e| EikonalError::Other(format!("shape error: {}", e)))
}

/// Read the named 2-D numeric variable from a .mat file.
pub fn read_mat_2d(path: &Path, variable_name: &str) -> Result<Array2<f64>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| EikonalError::Other(format!("MAT parse error: {}", e)))?;

    let array = mat.find_by_name(variable_name).ok_or_else(|| {
        EikonalError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available: mat.arrays().iter().map(|a| a.name().to_string()).collect(),
        }
    })?;

    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, imag: _ } => real.clone(),
        matfile::NumericData::Single { real, imag: _ } => {
            real.iter().map(|&v| f64::from(v)).collect()
        }
        _ => {
            return Err(EikonalError::UnsupportedDtype(
                "MAT file array is not f64 or f32".to_string(),
            ))
        }
    };

    // MATLAB stores [rows, cols] column-major
    let [rows, cols] = require_2d(array.size())?;
    Array2::from_shape_vec((rows, cols).f(), data).map_err(|_| EikonalError::ShapeMismatch {
        expected: vec![rows, cols],
        got: array.size().to_vec(),
    })
}

fn read_2d(path: &Path, mat_variable: &str) -> Result<Array2<f64>> {
    match infer_format(path)? {
        FileFormat::Npy => read_npy_2d(path),
        FileFormat::Mat => read_mat_2d(path, mat_variable),
    }
}

/// Load a slowness field from `.npy` or `.mat` (variable `slowness`).
pub fn load_slowness(path: &Path) -> Result<SlownessField> {
    SlownessField::from_array(read_2d(path, "slowness")?)
}

/// Load a velocity field from `.npy` or `.mat` (variable `velocity`) as slowness.
pub fn load_velocity_as_slowness(path: &Path) -> Result<SlownessField> {
    let velocity = read_2d(path, "velocity")?;
    SlownessField::from_array(velocity_to_slowness(velocity.view())?)
}

/// Convert a velocity array to slowness (element-wise 1/v).
///
/// Errors report the row-major flat index of the first bad value.
pub fn velocity_to_slowness(velocity: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    for (index, &v) in velocity.iter().enumerate() {
        if !v.is_finite() || v <= 0.0 {
            return Err(EikonalError::InvalidVelocity { index, value: v });
        }
    }
    Ok(velocity.mapv(|v| 1.0 / v))
}

fn write_npy_2d(path: &Path, arr: &Array2<f64>) -> Result<()> {
    ndarray_npy::write_npy(path, arr)
        .map_err(|e| EikonalError::Other(format!("npy write error: {}", e)))
}

fn write_2d(path: &Path, arr: &Array2<f64>, mat_variable: &str) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => write_npy_2d(path, arr),
        FileFormat::Mat => write_mat_2d(path, mat_variable, arr.view()),
    }
}

/// Save arrival times to `.npy` or `.mat` (variable `traveltime`).
///
/// Unreached cells are written as `+inf`.
pub fn save_arrival_times(times: &ArrivalTimeField, path: &Path) -> Result<()> {
    write_2d(path, &times.to_array(), "traveltime")
}

/// Pack ray polylines into an `(N, 3)` array of `[ray_index, row, col]`.
pub fn rays_to_array(rays: &[RayPath]) -> Array2<f64> {
    let total: usize = rays.iter().map(RayPath::len).sum();
    let mut flat = Vec::with_capacity(total * 3);
    for (i, ray) in rays.iter().enumerate() {
        for &[y, x] in ray.points() {
            flat.extend_from_slice(&[i as f64, y, x]);
        }
    }
    Array2::from_shape_fn((total, 3), |(r, k)| flat[r * 3 + k])
}

/// Save ray polylines to `.npy` or `.mat` (variable `rays`); see [`rays_to_array`].
pub fn save_rays(rays: &[RayPath], path: &Path) -> Result<()> {
    write_2d(path, &rays_to_array(rays), "rays")
}

/// Write one real double matrix as a MAT-File Level 5 file.
///
/// The `matfile` crate only reads, so this is a minimal uncompressed writer:
/// a 128-byte header followed by a single `miMATRIX` element holding the
/// array flags, dimensions, name and column-major data.
///
/// Format reference: <https://www.mathworks.com/help/pdf_doc/matlab/matfile_format.pdf>
pub fn write_mat_2d(path: &Path, var_name: &str, arr: ArrayView2<'_, f64>) -> Result<()> {
    const MI_INT8: u32 = 1;
    const MI_INT32: u32 = 5;
    const MI_UINT32: u32 = 6;
    const MI_DOUBLE: u32 = 9;
    const MI_MATRIX: u32 = 14;
    const MX_DOUBLE_CLASS: u32 = 6;

    let (rows, cols) = arr.dim();
    let too_large = || EikonalError::Other("array too large for a Level 5 MAT file".to_string());
    let dim_rows = i32::try_from(rows).map_err(|_| too_large())?;
    let dim_cols = i32::try_from(cols).map_err(|_| too_large())?;

    // Row-major order of the transpose is column-major order of `arr`
    let col_major: Vec<u8> = arr.t().iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut dims = Vec::with_capacity(8);
    dims.extend_from_slice(&dim_rows.to_le_bytes());
    dims.extend_from_slice(&dim_cols.to_le_bytes());
    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&MX_DOUBLE_CLASS.to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());

    let elements: [(u32, &[u8]); 4] = [
        (MI_UINT32, flags.as_slice()),
        (MI_INT32, dims.as_slice()),
        (MI_INT8, var_name.as_bytes()),
        (MI_DOUBLE, col_major.as_slice()),
    ];

    let padded = |len: usize| len.div_ceil(8) * 8;
    let matrix_size: usize = elements.iter().map(|(_, d)| 8 + padded(d.len())).sum();
    let matrix_size = u32::try_from(matrix_size).map_err(|_| too_large())?;

    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    // Header: descriptive text, subsystem offset, version, endian marker
    let desc = b"MATLAB 5.0 MAT-file, created by eikonal-fmm";
    let mut header_text = [b' '; 116];
    header_text[..desc.len()].copy_from_slice(desc);
    w.write_all(&header_text)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;

    w.write_all(&MI_MATRIX.to_le_bytes())?;
    w.write_all(&matrix_size.to_le_bytes())?;
    for (ty, data) in elements {
        // Sizes were bounded by the u32 check on the enclosing element
        w.write_all(&ty.to_le_bytes())?;
        w.write_all(&(data.len() as u32).to_le_bytes())?;
        w.write_all(data)?;
        w.write_all(&vec![0u8; padded(data.len()) - data.len()])?;
    }

    w.flush()?;
    Ok(())
}
