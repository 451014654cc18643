use std::{
    fs::{self, File},
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use deathlog_analysis::pipeline::Ingest;

#[derive(Debug)]
pub enum Output {
    Stdout {
        writer: StdoutLock<'static>,
    },
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        let mut output = Output::from_output_path(output_path)?;
        output.write_json(value)
    }

    pub fn from_output_path(output_path: Option<PathBuf>) -> anyhow::Result<Self> {
        match output_path {
            Some(path) => Output::open(path),
            None => Ok(Output::stdout()),
        }
    }

    pub fn stdout() -> Self {
        Output::Stdout {
            writer: io::stdout().lock(),
        }
    }

    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Output::File {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn display_path(&self) -> String {
        match self {
            Output::Stdout { .. } => "stdout".to_string(),
            Output::File { path, .. } => path.display().to_string(),
        }
    }

    pub fn write_json<T>(&mut self, value: T) -> anyhow::Result<()>
    where
        T: serde::Serialize,
    {
        serde_json::to_writer_pretty(&mut *self, &value)
            .with_context(|| format!("Failed to write JSON to {}", self.display_path()))?;
        writeln!(&mut *self).with_context(|| {
            format!(
                "Failed to write newline after JSON to {}",
                self.display_path()
            )
        })?;
        self.flush()
            .with_context(|| format!("Failed to flush output to {}", self.display_path()))?;
        Ok(())
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout { writer } => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout { writer } => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

/// Reads every regular file directly under `dir`, in path order.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected.
pub fn read_documents<P>(dir: P) -> anyhow::Result<Vec<(PathBuf, String)>>
where
    P: AsRef<Path>,
{
    let dir = dir.as_ref();
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?
    {
        let entry = entry
            .with_context(|| format!("Failed to read input directory: {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let bytes = fs::read(&path)
                .with_context(|| format!("Failed to read input file: {}", path.display()))?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            Ok((path, text))
        })
        .collect()
}

/// Extracts and deduplicates every document under `dir`.
pub fn ingest_dir<P>(dir: P) -> anyhow::Result<Ingest>
where
    P: AsRef<Path>,
{
    let dir = dir.as_ref();
    let mut ingest = Ingest::new();
    for (path, text) in read_documents(dir)? {
        let extracted = ingest.add_document(&text);
        tracing::debug!(
            path = %path.display(),
            extracted,
            canonical = ingest.canonical().len(),
            "read document"
        );
    }

    let report = ingest.report();
    tracing::info!(
        dir = %dir.display(),
        documents = report.documents,
        records = report.records,
        dropped = report.dropped(),
        duplicates = report.duplicates,
        canonical = ingest.canonical().len(),
        "ingested documents"
    );
    Ok(ingest)
}
