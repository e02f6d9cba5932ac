//! Decode command - turn obfuscated bytecode files into listings.

use anyhow::{Context, Result};
use bcdec_bytecode::{JsonListing, ProtoWriter};
use bcdec_gc::Heap;
use bcdec_reader::{DecodeOptions, Decoder};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Name of the default output directory
const OUTPUT_DIR: &str = "dec";

/// One invocation: what to decode and where to put it
#[derive(Debug)]
pub struct DecodeJob {
    /// Input file or directory
    pub input: PathBuf,
    /// Output directory (default: `dec` next to the input)
    pub output: Option<PathBuf>,
    /// Decoder options
    pub options: DecodeOptions,
    /// Indent listings
    pub pretty: bool,
}

/// Outcome of a job
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Files decoded and written
    pub decoded: usize,
    /// Files that failed
    pub failed: usize,
}

impl DecodeJob {
    /// Decode every input file. Per-file failures are logged and counted;
    /// only setup problems abort the job.
    pub fn run(&self) -> Result<Summary> {
        let meta = std::fs::metadata(&self.input)
            .with_context(|| format!("Cannot access {}", self.input.display()))?;

        let (files, default_out) = if meta.is_dir() {
            (list_files(&self.input)?, self.input.join(OUTPUT_DIR))
        } else {
            let parent = match self.input.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            (vec![self.input.clone()], parent.join(OUTPUT_DIR))
        };
        let out_dir = self.output.clone().unwrap_or(default_out);
        std::fs::create_dir_all(&out_dir)
            .with_context(|| format!("Cannot create {}", out_dir.display()))?;

        let decoder = Decoder::with_options(self.options);
        let writer = JsonListing::new(self.pretty);
        let mut heap = Heap::new();
        let mut summary = Summary::default();

        for (i, file) in files.iter().enumerate() {
            if i > 0 {
                heap.begin_cycle();
            }
            match decode_file(&decoder, &writer, &mut heap, file, &out_dir) {
                Ok(out) => {
                    tracing::info!("{} -> {}", file.display(), out.display());
                    summary.decoded += 1;
                }
                Err(e) => {
                    tracing::error!("{e:#}");
                    summary.failed += 1;
                }
            }
        }

        tracing::debug!(
            decoded = summary.decoded,
            failed = summary.failed,
            strings = heap.strings().len(),
            "done"
        );
        Ok(summary)
    }
}

/// Non-directory entries of `dir`, sorted by name
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Cannot read {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Listing file name: the input name up to its first `.`, plus `extension`
pub fn output_name(file_name: &str, extension: &str) -> String {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    format!("{stem}.{extension}")
}

fn decode_file<W: ProtoWriter>(
    decoder: &Decoder,
    writer: &W,
    heap: &mut Heap,
    path: &Path,
    out_dir: &Path,
) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("No file name in {}", path.display()))?;

    let input = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let proto = decoder
        .decode(heap, BufReader::new(input), &format!("@{file_name}"))
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    let out_path = out_dir.join(output_name(&file_name, W::EXTENSION));
    let out = File::create(&out_path)
        .with_context(|| format!("Cannot create {}", out_path.display()))?;
    let mut out = BufWriter::new(out);
    writer
        .write_to(&proto, &mut out)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    out.flush()?;
    Ok(out_path)
}
