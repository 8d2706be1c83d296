use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use thiserror::Error;

use pagedb::{
    BufferManager, ConfigError, EngineConfig, Executor, ExecutorError, FileError, PAGE_SIZE, PageId,
    RecordError, RecordSchema, SeqScanExecutor, TableHandle, execute,
};

/// Inspect and manage page files
#[derive(Parser)]
#[command(name = "pagedb", version)]
struct Cli {
    /// JSON engine config; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty file
    Create { file: PathBuf },
    /// Delete a file
    Destroy { file: PathBuf },
    /// Show the page count of a file
    Info { file: PathBuf },
    /// Hex dump one page
    DumpPage { file: PathBuf, page: PageId },
    /// Print every record of a table file
    Scan {
        file: PathBuf,
        /// JSON file holding the table's field list
        #[arg(long)]
        schema: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("Cannot read schema {path}: {reason}")]
    Schema { path: PathBuf, reason: String },
}

type CliResult<T> = Result<T, CliError>;

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut bm = config.build();

    match cli.command {
        Command::Create { file } => {
            bm.disk_manager_mut().create_file(&file)?;
            println!("created {}", file.display());
        }
        Command::Destroy { file } => {
            bm.disk_manager_mut().destroy_file(&file)?;
            println!("destroyed {}", file.display());
        }
        Command::Info { file } => {
            let pages = page_count(&mut bm, &file)?;
            println!("{}: {} pages of {} bytes", file.display(), pages, PAGE_SIZE);
        }
        Command::DumpPage { file, page } => {
            let fid = bm.disk_manager_mut().open_file(&file)?;
            let data = bm.get_page(fid, page)?;
            print!("{}", hex_dump(data));
        }
        Command::Scan { file, schema } => {
            let schema = load_schema(&schema)?;

            // Opening an empty table would format page 0; report it as is
            if page_count(&mut bm, &file)? == 0 {
                println!("(0 records)");
                return Ok(());
            }

            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let table = TableHandle::open(Arc::new(Mutex::new(bm)), &file, &name, schema)?;

            let mut scan = Executor::from(SeqScanExecutor::new(table.into_shared()));
            let records = execute(&mut scan)?;
            for record in &records {
                println!("{}", record);
            }
            println!("({} records)", records.len());
        }
    }

    Ok(())
}

fn page_count(bm: &mut BufferManager, file: &Path) -> CliResult<usize> {
    let dm = bm.disk_manager_mut();
    let fid = dm.open_file(file)?;
    let pages = dm.get_page_count(fid);
    dm.close_file(fid)?;
    Ok(pages?)
}

fn load_schema(path: &Path) -> CliResult<RecordSchema> {
    let schema_error = |reason: String| CliError::Schema {
        path: path.to_path_buf(),
        reason,
    };
    let content = fs::read_to_string(path).map_err(|e| schema_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| schema_error(e.to_string()))
}

/// 16 bytes per line: offset, hex, printable ASCII
fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<47}  |{}|\n", line * 16, hex.join(" "), ascii));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagedb::{DiskManager, Record, Value};
    use tempfile::TempDir;

    const SCHEMA: &str = r#"[{"name":"id","type":"int"},{"name":"name","type":{"char":8}}]"#;

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let table = temp_dir.path().join("people.tbl");
        let schema = temp_dir.path().join("people.json");
        fs::write(&schema, SCHEMA).unwrap();
        (temp_dir, table, schema)
    }

    fn scan(file: &Path, schema: &Path) -> CliResult<()> {
        run(Cli {
            config: None,
            command: Command::Scan {
                file: file.to_path_buf(),
                schema: schema.to_path_buf(),
            },
        })
    }

    #[test]
    fn test_scan_empty_file_does_not_write() {
        let (_temp_dir, table, schema) = setup();
        DiskManager::new().create_file(&table).unwrap();

        scan(&table, &schema).unwrap();
        assert_eq!(fs::metadata(&table).unwrap().len(), 0);
    }

    #[test]
    fn test_scan_table() {
        let (_temp_dir, table, schema) = setup();
        {
            let schema = load_schema(&schema).unwrap();
            let bm = Arc::new(Mutex::new(BufferManager::new(DiskManager::new())));
            let mut handle = TableHandle::create(bm, &table, "people", schema).unwrap();
            handle
                .insert_record(&Record::new(vec![
                    Value::Int(1),
                    Value::String("ann".to_string()),
                ]))
                .unwrap();
            handle.close().unwrap();
        }

        scan(&table, &schema).unwrap();
        assert_eq!(fs::metadata(&table).unwrap().len(), PAGE_SIZE as u64);
    }

    #[test]
    fn test_scan_missing_file() {
        let (_temp_dir, table, schema) = setup();
        assert!(matches!(
            scan(&table, &schema),
            Err(CliError::File(FileError::FileNotExists { .. }))
        ));
    }

    #[test]
    fn test_hex_dump_line() {
        let dump = hex_dump(b"AB\x00");
        assert_eq!(dump, format!("00000000  {:<47}  |AB.|\n", "41 42 00"));
    }
}
