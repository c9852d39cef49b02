use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

///
/// Check the first two bytes of a file for the gzip magic number
/// * `input_file` - file name
///
pub fn is_gzipped(input_file: &str) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    let mut file = File::open(input_file)?;
    let nread = read_up_to(&mut file, &mut magic)?;
    Ok(nread == 2 && magic == GZIP_MAGIC)
}

///
/// Read the first `n` bytes of a file after transparent decompression
/// * `input_file` - file name--either gzipped or not
/// * `n` - number of bytes (fewer if the file is shorter)
///
pub fn peek_bytes(input_file: &str, n: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    let mut reader = open_buf_reader(input_file)?;
    let nread = read_up_to(&mut reader, &mut buf)?;
    buf.truncate(nread);
    Ok(buf)
}

/// like `read_exact` but a short file is not an error
pub fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut nread = 0;
    while nread < buf.len() {
        match reader.read(&mut buf[nread..]) {
            Ok(0) => break,
            Ok(n) => nread += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(nread)
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not (decided by magic bytes)
///
pub fn open_buf_reader(input_file: &str) -> io::Result<Box<dyn BufRead>> {
    let gzipped = is_gzipped(input_file)?;
    let file = File::open(input_file)?;
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not; `stdout` and
///   `stderr` are treated as the standard streams
///
pub fn open_buf_writer(output_file: &str) -> io::Result<Box<dyn Write>> {
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }

    if output_file.eq_ignore_ascii_case("stderr") {
        return Ok(Box::new(BufWriter::new(io::stderr())));
    }

    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    match ext {
        Some("gz") => {
            let output_file = File::create(output_file)?;
            let encoder =
                flate2::write::GzEncoder::new(output_file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => {
            let output_file = File::create(output_file)?;
            Ok(Box::new(BufWriter::new(output_file)))
        }
    }
}

///
/// Read every line of the input_file into memory
///
/// * `input_file` - file name--either gzipped or not
///
pub fn read_lines(input_file: &str) -> io::Result<Vec<Box<str>>> {
    let buf = open_buf_reader(input_file)?;
    let mut lines = vec![];
    for x in buf.lines() {
        lines.push(x?.into_boxed_str());
    }
    Ok(lines)
}

/// The first non-empty line of a file, if any
pub fn read_first_line(input_file: &str) -> io::Result<Option<Box<str>>> {
    let buf = open_buf_reader(input_file)?;
    for x in buf.lines() {
        let x = x?;
        let trimmed = x.trim_end();
        if !trimmed.is_empty() {
            return Ok(Some(trimmed.into()));
        }
    }
    Ok(None)
}

///
/// Write every line into the output_file
///
/// * `lines` - anything that can be displayed
/// * `output_file` - file name--either gzipped or not
///
pub fn write_types<T>(lines: &[T], output_file: &str) -> io::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file)?;
    if append_lines(&mut buf, lines)? {
        buf.flush()?;
    }
    Ok(())
}

///
/// Write lines into an open writer. Returns `false` once the reader on
/// the other side of a pipe has gone away.
///
pub fn append_lines<W, T>(buf: &mut W, lines: &[T]) -> io::Result<bool>
where
    W: Write + ?Sized,
    T: std::fmt::Display,
{
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                return Ok(false);
            } else {
                return Err(e);
            }
        }
    }
    Ok(true)
}

///
/// Create a parent directory if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> io::Result<()> {
    let path = Path::new(file);
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}

///
/// Take the basename of a file, dropping `.gz` and one more extension
/// * `file` - file name
///
pub fn basename(file: &str) -> Option<Box<str>> {
    let path = Path::new(file);
    let stem = match path.extension().and_then(|x| x.to_str()) {
        Some("gz") => Path::new(path.file_stem()?).file_stem()?,
        _ => path.file_stem()?,
    };
    stem.to_str().map(Box::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_gzip_detected_by_content() {
        let dir = TempDir::new().unwrap();
        // no .gz extension on purpose
        let path = dir.path().join("calls.tsv");
        let file = File::create(&path).unwrap();
        let mut enc = GzEncoder::new(file, Compression::default());
        writeln!(enc, "chromosome\tstart").unwrap();
        writeln!(enc, "chr1\t10").unwrap();
        enc.finish().unwrap();

        let path = path.to_str().unwrap();
        assert!(is_gzipped(path).unwrap());
        let lines = read_lines(path).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].as_ref(), "chr1\t10");
    }

    #[test]
    fn test_first_line_and_peek() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file).unwrap();
        writeln!(file, "a\tb\tc").unwrap();
        file.flush().unwrap();
        let path = file.path().to_str().unwrap();

        assert!(!is_gzipped(path).unwrap());
        assert_eq!(read_first_line(path).unwrap().as_deref(), Some("a\tb\tc"));
        assert_eq!(peek_bytes(path, 100).unwrap().len(), 7);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("dir/sample.tsv.gz").as_deref(), Some("sample"));
        assert_eq!(basename("sample.bam").as_deref(), Some("sample"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_append_lines() {
        let mut out: Vec<u8> = vec![];
        assert!(append_lines(&mut out, &["a", "b"]).unwrap());
        assert!(append_lines(&mut out, &[1, 2]).unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n1\n2\n");

        assert!(!append_lines(&mut ClosedPipe, &["a"]).unwrap());
    }

    #[test]
    fn test_read_up_to_short_input() {
        let mut buf = [0u8; 8];
        let mut src: &[u8] = b"abc";
        assert_eq!(read_up_to(&mut src, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
    }
}
