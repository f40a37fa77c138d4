//! MNIST reader.
//!
//! Reads the gzipped IDX files of the MNIST handwritten digit database from a local
//! directory. Images become rows of 784 pixels scaled into `[0.01, 1.0]`; labels
//! become one-hot rows of length 10.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::{Error, Frame, Result};

pub const WIDTH: usize = 28;
pub const HEIGHT: usize = 28;
pub const PIXELS: usize = WIDTH * HEIGHT;
pub const CLASSES: usize = 10;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

const TRAIN_IMAGES: &str = "train-images-idx3-ubyte.gz";
const TRAIN_LABELS: &str = "train-labels-idx1-ubyte.gz";
const TEST_IMAGES: &str = "t10k-images-idx3-ubyte.gz";
const TEST_LABELS: &str = "t10k-labels-idx1-ubyte.gz";

/// Inputs and one-hot labels of one split, row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct MnistSplit {
    pub inputs: Frame,
    pub labels: Frame,
}

impl MnistSplit {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MnistDataset {
    pub train: MnistSplit,
    /// Present when the t10k files exist.
    pub test: Option<MnistSplit>,
}

impl MnistDataset {
    /// Read a dataset directory. The training files are required, the test files
    /// are optional.
    pub fn read<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let train = read_split(dir, TRAIN_IMAGES, TRAIN_LABELS)?;

        let test = if dir.join(TEST_IMAGES).exists() && dir.join(TEST_LABELS).exists() {
            Some(read_split(dir, TEST_IMAGES, TEST_LABELS)?)
        } else {
            tracing::debug!(dir = %dir.display(), "no test split found");
            None
        };

        tracing::info!(
            dir = %dir.display(),
            train = train.len(),
            test = test.as_ref().map_or(0, MnistSplit::len),
            "mnist loaded"
        );
        Ok(Self { train, test })
    }

    /// Keep only the first `n` training examples.
    pub fn truncate_train(&mut self, n: usize) {
        self.train.inputs.truncate(n);
        self.train.labels.truncate(n);
    }
}

fn read_split(dir: &Path, images: &str, labels: &str) -> Result<MnistSplit> {
    let inputs = read_images(open_gz(&dir.join(images))?)?;
    let label_rows = read_labels(open_gz(&dir.join(labels))?)?;
    if inputs.len() != label_rows.len() {
        return Err(Error::InvalidData(format!(
            "{images} holds {} images but {labels} holds {} labels",
            inputs.len(),
            label_rows.len()
        )));
    }
    Ok(MnistSplit {
        inputs,
        labels: label_rows,
    })
}

fn open_gz(path: &Path) -> Result<GzDecoder<BufReader<File>>> {
    let f = File::open(path)
        .map_err(|e| Error::InvalidData(format!("failed to open {}: {e}", path.display())))?;
    Ok(GzDecoder::new(BufReader::new(f)))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader
        .read_exact(&mut buf)
        .map_err(|e| Error::InvalidData(format!("truncated idx header: {e}")))?;
    Ok(u32::from_be_bytes(buf))
}

/// Read exactly `len` bytes without trusting `len` for the allocation size.
fn read_body<R: Read>(reader: &mut R, len: u64, what: &str) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    reader
        .by_ref()
        .take(len)
        .read_to_end(&mut raw)
        .map_err(|e| Error::InvalidData(format!("failed to read {what}: {e}")))?;
    if raw.len() as u64 != len {
        return Err(Error::InvalidData(format!(
            "truncated {what}: header promises {len} bytes, found {}",
            raw.len()
        )));
    }
    Ok(raw)
}

fn check_magic(found: u32, expected: u32) -> Result<()> {
    if found != expected {
        return Err(Error::InvalidData(format!(
            "bad idx magic number {found}, expected {expected}"
        )));
    }
    Ok(())
}

/// Read an (uncompressed) IDX3 image stream.
pub fn read_images<R: Read>(mut reader: R) -> Result<Frame> {
    check_magic(read_u32(&mut reader)?, IMAGES_MAGIC)?;
    let count = read_u32(&mut reader)? as usize;
    let rows = read_u32(&mut reader)? as usize;
    let cols = read_u32(&mut reader)? as usize;
    if (rows, cols) != (HEIGHT, WIDTH) {
        return Err(Error::InvalidData(format!(
            "expected {HEIGHT}x{WIDTH} images, got {rows}x{cols}"
        )));
    }

    let raw = read_body(&mut reader, count as u64 * PIXELS as u64, "image data")?;

    let pixels = raw.iter().map(|&p| normalize(p)).collect();
    Frame::from_flat(pixels, PIXELS)
}

/// Read an (uncompressed) IDX1 label stream into one-hot rows.
pub fn read_labels<R: Read>(mut reader: R) -> Result<Frame> {
    check_magic(read_u32(&mut reader)?, LABELS_MAGIC)?;
    let count = read_u32(&mut reader)? as usize;

    let raw = read_body(&mut reader, count as u64, "label data")?;

    let mut one_hot = vec![0.0_f32; count * CLASSES];
    for (i, &label) in raw.iter().enumerate() {
        let label = label as usize;
        if label >= CLASSES {
            return Err(Error::InvalidData(format!(
                "label {label} at index {i} is not a digit"
            )));
        }
        one_hot[i * CLASSES + label] = 1.0;
    }
    Frame::from_flat(one_hot, CLASSES)
}

/// Scale a raw pixel into `[0.01, 1.0]`.
#[inline]
pub fn normalize(raw: u8) -> f32 {
    raw as f32 / 255.0 * 0.99 + 0.01
}
