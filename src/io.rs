use encoding_rs::Encoding;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

use crate::codec::CharsetDecoder;

/// Small buffer: the preview only ever needs the first few lines.
const PREVIEW_BUFFER: usize = 8 * 1024;

/// A file picked for import. Cloning copies the handle, not the contents.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    path: PathBuf,
    /// just the file name (used for the extension check and the multipart part)
    name: String,
    /// size in bytes at selection time
    size: u64,
    /// Which character encoding to expect (defaults to UTF-8)
    charset: &'static Encoding,
}

impl SelectedFile {
    /// Stat a local file and wrap it as a selection. Directories are refused.
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            charset: encoding_rs::UTF_8,
        })
    }

    /// Declare a non-UTF-8 charset, e.g. for spreadsheet exports in Windows-1252.
    pub fn with_charset(mut self, charset: &'static Encoding) -> Self {
        self.charset = charset;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn charset(&self) -> &'static Encoding {
        self.charset
    }

    pub fn has_csv_extension(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
    }

    /// Open the file as UTF-8 text, transcoding on the fly when needed.
    pub async fn text_reader(&self) -> io::Result<Box<dyn AsyncRead + Unpin + Send>> {
        let file = File::open(&self.path).await?;
        Ok(build_text_reader(file, self.charset))
    }
}

/// From a generic AsyncRead, wrap with buffering and UTF-8 transcoding.
/// Returns an AsyncRead suitable for csv_async.
pub fn build_text_reader<R>(raw: R, charset: &'static Encoding) -> Box<dyn AsyncRead + Unpin + Send>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(PREVIEW_BUFFER, raw);

    // csv_async validates UTF-8 itself, so only other charsets pay for a copy
    if charset == encoding_rs::UTF_8 {
        Box::new(buf)
    } else {
        let framed = FramedRead::new(buf, CharsetDecoder::new(charset));
        Box::new(StreamReader::new(framed))
    }
}
