use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::tempdir;

///
/// Write every line into the output_file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T>(lines: &[T], output_file_path: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file_path)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            }
            return Err(anyhow::anyhow!("failed to write {}: {}", output_file_path, e));
        }
    }
    buf.flush()?;
    Ok(())
}

pub struct ReadLinesOut<T: Send> {
    pub lines: Vec<Vec<T>>,
    pub header: Vec<Box<str>>,
}

fn is_comment_line(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('%')
}

///
/// Read lines, skipping `#` and `%` comments, and parse each of them
/// in parallel while keeping the original order.
///
/// * `input_file` - file name--either gzipped or not
/// * `hdr_line` - location of a header line among non-comment lines (-1 = none)
/// * `parse_fn` - line parser; may fail
///
pub fn read_lines_with<T>(
    input_file: &str,
    hdr_line: i64,
    parse_fn: impl Fn(&str) -> anyhow::Result<Vec<T>> + Sync,
) -> anyhow::Result<ReadLinesOut<T>>
where
    T: Send,
{
    let buf_reader = open_buf_reader(input_file)?;

    let mut lines_raw = vec![];
    for line in buf_reader.lines() {
        let line = line?;
        if is_comment_line(&line) || line.trim().is_empty() {
            continue;
        }
        lines_raw.push(line.into_boxed_str());
    }

    let (header, body) = if hdr_line < 0 {
        (vec![], &lines_raw[..])
    } else {
        let n_skip = hdr_line as usize;
        if lines_raw.len() < n_skip + 1 {
            return Err(anyhow::anyhow!("not enough lines in {}", input_file));
        }
        let header = lines_raw[n_skip]
            .split_whitespace()
            .map(Box::from)
            .collect::<Vec<_>>();
        (header, &lines_raw[(n_skip + 1)..])
    };

    // par_iter on a slice keeps the order on collect
    let lines = body
        .par_iter()
        .map(|s| parse_fn(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(ReadLinesOut { lines, header })
}

///
/// Read lines and parse every field into `T`
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - field separator
/// * `hdr_line` - location of a header line (-1 = no header line)
///
pub fn read_lines_of_types<T>(
    input_file: &str,
    delim: &str,
    hdr_line: i64,
) -> anyhow::Result<ReadLinesOut<T>>
where
    T: Send + std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    let parse_fn = |line: &str| -> anyhow::Result<Vec<T>> {
        line.trim_end()
            .split(delim)
            .map(|x| {
                x.trim()
                    .parse::<T>()
                    .map_err(|e| anyhow::anyhow!("failed to parse `{}`: {:?}", x, e))
            })
            .collect()
    };

    read_lines_with(input_file, hdr_line, parse_fn)
}

///
/// Read lines and split them into whitespace-separated words
///
/// * `input_file` - file name--either gzipped or not
/// * `hdr_line` - location of a header line (-1 = no header line)
///
pub fn read_lines_of_words(
    input_file: &str,
    hdr_line: i64,
) -> anyhow::Result<ReadLinesOut<Box<str>>> {
    read_lines_with(input_file, hdr_line, |line| {
        Ok(line.split_whitespace().map(Box::from).collect())
    })
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(input_file)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", input_file, e))?;

    match Path::new(input_file).extension().and_then(|x| x.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not; `stdout` writes to the console
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    mkdir(output_file)?;
    let file = File::create(output_file)?;

    match Path::new(output_file).extension().and_then(|x| x.to_str()) {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Create the parent directory of a file if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    if let Some(dir) = Path::new(file).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

///
/// Create a temporary directory and suggest a file name
/// * `suffix` - suffix of the file name
///
pub fn create_temp_dir_file(suffix: &str) -> anyhow::Result<std::path::PathBuf> {
    let temp_dir = tempdir()?.path().to_path_buf();
    std::fs::create_dir_all(&temp_dir)?;
    let temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile_in(temp_dir)?
        .path()
        .to_owned();

    Ok(temp_file)
}

///
/// Remove a file if it exists
/// * `file` - file name
///
pub fn remove_file(file: &str) -> anyhow::Result<()> {
    let path = Path::new(file);
    if path.is_file() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_header_are_skipped() -> anyhow::Result<()> {
        let file = create_temp_dir_file(".txt.gz")?;
        let file = file.to_str().ok_or(anyhow::anyhow!("path"))?;

        let lines: Vec<Box<str>> = vec![
            "% comment".into(),
            "2 3".into(),
            "1\t2\t3".into(),
            "4\t5\t6".into(),
        ];
        write_lines(&lines, file)?;

        let out = read_lines_of_types::<f64>(file, "\t", 0)?;
        assert_eq!(out.header.len(), 2);
        assert_eq!(out.lines, vec![vec![1., 2., 3.], vec![4., 5., 6.]]);

        remove_file(file)?;
        Ok(())
    }

    #[test]
    fn unparsable_field_is_an_error() -> anyhow::Result<()> {
        let file = create_temp_dir_file(".txt")?;
        let file = file.to_str().ok_or(anyhow::anyhow!("path"))?;
        write_lines(&["1\tx"], file)?;
        assert!(read_lines_of_types::<f64>(file, "\t", -1).is_err());
        remove_file(file)?;
        Ok(())
    }
}
