//! Fixed-width byte-string `.npy` files (`|S<width>`).
//!
//! `ndarray-npy` covers the numeric dtypes; NumPy's fixed-width byte strings
//! are not among its element types, so label datasets are framed here. The
//! header follows the same layout `ndarray-npy` emits: format 1.0 when the
//! dictionary fits a `u16` length, 2.0 otherwise, padded so the data starts
//! on a 64-byte boundary.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::truncate_to_width;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

fn shape_literal(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({n},)"),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

pub(crate) fn header_bytes(descr: &str, shape: &[usize]) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{descr}', 'fortran_order': False, 'shape': {}, }}",
        shape_literal(shape)
    );

    // magic + version + length field, then dict + '\n', padded.
    let (version, len_field) = if NPY_MAGIC.len() + 2 + 2 + dict.len() + 1 + HEADER_ALIGN
        <= u16::MAX as usize
    {
        (1u8, 2usize)
    } else {
        (2u8, 4usize)
    };
    let prefix = NPY_MAGIC.len() + 2 + len_field;
    let unpadded = prefix + dict.len() + 1;
    let pad = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header_len = dict.len() + pad + 1;

    let mut out = Vec::with_capacity(prefix + header_len);
    out.extend_from_slice(NPY_MAGIC);
    out.push(version);
    out.push(0);
    if version == 1 {
        out.extend_from_slice(&(header_len as u16).to_le_bytes());
    } else {
        out.extend_from_slice(&(header_len as u32).to_le_bytes());
    }
    out.extend_from_slice(dict.as_bytes());
    out.extend(std::iter::repeat(b' ').take(pad));
    out.push(b'\n');
    out
}

/// Write `values` (row-major, `shape.iter().product()` of them) as `|S<width>`.
pub(crate) fn write_fixed_string_npy(
    path: &Path,
    shape: &[usize],
    width: usize,
    values: &[String],
) -> StoreResult<()> {
    let io_err = |e| StoreError::io(path, e);
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    out.write_all(&header_bytes(&format!("|S{width}"), shape))
        .map_err(io_err)?;

    let count: usize = shape.iter().product();
    let mut cell = vec![0u8; width];
    for i in 0..count {
        cell.fill(0);
        if let Some(value) = values.get(i) {
            let bytes = truncate_to_width(value, width).as_bytes();
            cell[..bytes.len()].copy_from_slice(bytes);
        }
        out.write_all(&cell).map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}

/// Read a `|S<width>` file back: (shape, width, values).
pub(crate) fn read_fixed_string_npy(path: &Path) -> StoreResult<(Vec<usize>, usize, Vec<String>)> {
    let malformed = |message: &str| StoreError::NpyHeader {
        path: path.to_path_buf(),
        message: message.to_string(),
    };

    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| StoreError::io(path, e))?;

    if bytes.len() < 10 || &bytes[..NPY_MAGIC.len()] != NPY_MAGIC {
        return Err(malformed("missing magic string"));
    }
    let (header_start, header_len) = match bytes[6] {
        1 => (10, u16::from_le_bytes([bytes[8], bytes[9]]) as usize),
        2 | 3 if bytes.len() >= 12 => (
            12,
            u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize,
        ),
        _ => return Err(malformed("unsupported format version")),
    };
    let data_start = header_start + header_len;
    let header = bytes
        .get(header_start..data_start)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| malformed("truncated header"))?;

    let width = header
        .split_once("'descr': '|S")
        .and_then(|(_, rest)| rest.split_once('\''))
        .and_then(|(digits, _)| digits.parse::<usize>().ok())
        .filter(|w| *w > 0)
        .ok_or_else(|| malformed("descr is not a fixed-width byte string"))?;
    if header.contains("'fortran_order': True") {
        return Err(malformed("fortran order is not supported"));
    }
    let shape = header
        .split_once("'shape': (")
        .and_then(|(_, rest)| rest.split_once(')'))
        .map(|(dims, _)| {
            dims.split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::parse::<usize>)
                .collect::<Result<Vec<_>, _>>()
        })
        .ok_or_else(|| malformed("missing shape"))?
        .map_err(|_| malformed("shape is not a tuple of integers"))?;

    let count: usize = shape.iter().product();
    let data = &bytes[data_start..];
    if data.len() != count * width {
        return Err(malformed("data length does not match shape"));
    }
    let values = data
        .chunks_exact(width)
        .map(|cell| {
            let end = cell.iter().rposition(|b| *b != 0).map_or(0, |p| p + 1);
            String::from_utf8_lossy(&cell[..end]).into_owned()
        })
        .collect();
    Ok((shape, width, values))
}
