//! Frame source: manifest records decoded into caller-owned buffers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::depth::DepthLoader;
use super::manifest::ManifestReader;
use crate::tracking::frame::DepthFrame;

/// Name of the manifest inside a dataset directory.
pub const MANIFEST_FILE: &str = "depth.txt";

/// Deterministic sequence of depth frames.
pub trait FrameSource {
    /// Load the next frame into `frame` and return its timestamp.
    ///
    /// Ok(None) is end of stream; `frame` is left untouched in that case.
    fn produce_next(&mut self, frame: &mut DepthFrame) -> Result<Option<u64>>;
}

/// Frames listed in a dataset's `depth.txt`, image paths relative to the dataset root.
pub struct ManifestFrameSource<R, L> {
    reader: ManifestReader<R>,
    root: PathBuf,
    loader: L,
    produced: usize,
}

impl<L: DepthLoader> ManifestFrameSource<BufReader<File>, L> {
    /// Open `<root>/depth.txt`.
    pub fn open<P: AsRef<Path>>(root: P, loader: L) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE);
        let file = File::open(&manifest_path)
            .with_context(|| format!("Failed to open {}", manifest_path.display()))?;
        Ok(Self::from_reader(BufReader::new(file), root, loader))
    }
}

impl<R: BufRead, L: DepthLoader> ManifestFrameSource<R, L> {
    pub fn from_reader(reader: R, root: PathBuf, loader: L) -> Self {
        Self {
            reader: ManifestReader::new(reader),
            root,
            loader,
            produced: 0,
        }
    }

    /// Frames produced so far.
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Non-data manifest lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.reader.skipped()
    }
}

impl<R: BufRead, L: DepthLoader> FrameSource for ManifestFrameSource<R, L> {
    fn produce_next(&mut self, frame: &mut DepthFrame) -> Result<Option<u64>> {
        let Some(record) = self.reader.next_record()? else {
            return Ok(None);
        };

        let path = self.root.join(&record.path);
        self.loader
            .load_into(&path, frame)
            .with_context(|| format!("Failed to load frame {}", record.timestamp))?;
        frame.timestamp = record.timestamp;
        self.produced += 1;

        Ok(Some(record.timestamp))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Fills every sample with the byte sum of the file name,
    /// so tests can tell frames apart without touching the filesystem.
    pub(crate) struct FakeLoader;

    impl DepthLoader for FakeLoader {
        fn load_into(&self, path: &Path, frame: &mut DepthFrame) -> Result<()> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            frame.data.fill(name_value(name));
            Ok(())
        }
    }

    pub(crate) fn name_value(name: &str) -> u16 {
        name.bytes().map(u16::from).sum()
    }

    pub(crate) fn source_from(manifest: &str) -> ManifestFrameSource<Cursor<String>, FakeLoader> {
        ManifestFrameSource::from_reader(
            Cursor::new(manifest.to_string()),
            PathBuf::from("/data"),
            FakeLoader,
        )
    }

    #[test]
    fn test_produces_frames_in_manifest_order() {
        let mut source = source_from("# header line here\n1.000001 a.png\n2.000002 bb.png\n");
        let mut frame = DepthFrame::new(2, 2);

        assert_eq!(source.produce_next(&mut frame).unwrap(), Some(1000001));
        assert_eq!(frame.timestamp, 1000001);
        assert_eq!(frame.data[0], name_value("a.png"));

        assert_eq!(source.produce_next(&mut frame).unwrap(), Some(2000002));
        assert_eq!(frame.data[0], name_value("bb.png"));

        assert_eq!(source.produce_next(&mut frame).unwrap(), None);
        assert_eq!(frame.timestamp, 2000002);
        assert_eq!(source.produced(), 2);
        assert_eq!(source.skipped(), 1);
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManifestFrameSource::open(dir.path(), FakeLoader)
            .err()
            .expect("open should fail");
        assert!(err.to_string().contains(MANIFEST_FILE));
    }

    #[test]
    fn test_opens_manifest_in_dataset_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "5.000005 x.png\n").unwrap();

        let mut source = ManifestFrameSource::open(dir.path(), FakeLoader).unwrap();
        let mut frame = DepthFrame::new(1, 1);
        assert_eq!(source.produce_next(&mut frame).unwrap(), Some(5000005));
    }
}
