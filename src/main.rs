//! Утилита командной строки для просмотра бинарных файлов моделей.

use clap::{Parser, Subcommand};
use rustyspec::serialization::{load_model, ModelFile};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Аргументы командной строки
#[derive(Parser, Debug)]
#[command(author, version, about = "RustySpec: model specification tools", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Показать заголовок и таблицу переменных файла модели
    Inspect {
        /// Путь к файлу модели
        model: PathBuf,
        /// Вывести описание в формате JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Inspect { model, json } => inspect(&model, json),
    }
}

fn inspect(path: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(path)?;
    tracing::debug!("loaded {} variables from {}", model.variables.len(), path.display());

    if json {
        let report = serde_json::json!({
            "binary_version": model.binary_version,
            "spec_name": model.spec_name,
            "revision": model.revision,
            "variables": model.variable_info(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print!("{}", render_report(path, &model));
    Ok(())
}

/// Текстовый отчет: заголовок файла и таблица переменных.
fn render_report(path: &Path, model: &ModelFile) -> String {
    let mut report = String::new();
    let name = if model.spec_name.is_empty() { "-" } else { model.spec_name.as_str() };
    report.push_str(&format!("Файл:       {}\n", path.display()));
    report.push_str(&format!("Версия:     {}\n", model.binary_version));
    report.push_str(&format!("Модель:     {}\n", name));
    report.push_str(&format!("Ревизия:    {}\n", model.revision));
    report.push_str(&format!("Переменных: {}\n\n", model.variables.len()));
    report.push_str(&format!("{:<60} {:<8} {}\n", "ИМЯ", "ТИП", "ФОРМА"));
    for info in model.variable_info() {
        report.push_str(&format!("{:<60} {:<8} {:?}\n", info.name, info.dtype.to_string(), info.shape));
    }
    report
}
