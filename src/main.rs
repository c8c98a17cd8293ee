use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use kifprep::{
    Diagnostic, Formula, KnowledgeBase, Preprocessor, VarGen, clausify, load_config,
    parse_kif_with_source,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kifprep")]
#[command(about = "SUO-KIF formula preprocessor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rewrite formulas into prover-ready form.
    Preprocess {
        file: PathBuf,
        /// KIF files loaded into the knowledge base.
        #[arg(long = "kb")]
        kb: Vec<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Treat formulas as queries.
        #[arg(long)]
        query: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print the clausal form of each formula.
    Clausify { file: PathBuf },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Command::Preprocess {
            file,
            kb,
            config,
            query,
            json,
        } => run_preprocess(&file, &kb, config.as_deref(), query, json),
        Command::Clausify { file } => run_clausify(&file),
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_formulas(file: &Path) -> Result<Vec<Formula>, Vec<Diagnostic>> {
    let src = fs::read_to_string(file).map_err(|err| {
        vec![Diagnostic::new(
            "E-IO",
            format!("failed to read {}: {}", file.display(), err),
            None,
        )]
    })?;
    parse_kif_with_source(&src, Some(&file.display().to_string()))
}

fn load_kb(files: &[PathBuf]) -> Result<KnowledgeBase, Vec<Diagnostic>> {
    let mut kb = KnowledgeBase::new();
    for file in files {
        for formula in read_formulas(file)? {
            if let Some(term) = formula.term() {
                kb.tell(term.clone());
            }
        }
    }
    Ok(kb)
}

fn report(diags: &[Diagnostic]) {
    for d in diags {
        eprintln!("{d}");
    }
}

fn run_preprocess(
    file: &Path,
    kb_files: &[PathBuf],
    config: Option<&Path>,
    is_query: bool,
    json: bool,
) -> i32 {
    let config = match config.map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(diag) => {
            report(&[diag]);
            return 1;
        }
    };
    let kb = match load_kb(kb_files) {
        Ok(kb) => kb,
        Err(diags) => {
            report(&diags);
            return 1;
        }
    };
    let mut formulas = match read_formulas(file) {
        Ok(formulas) => formulas,
        Err(diags) => {
            report(&diags);
            return 1;
        }
    };

    let mut preprocessor = Preprocessor::new(&kb, config);
    let accepted = preprocessor.preprocess_all(&mut formulas, is_query);
    let diagnostics: Vec<Diagnostic> = formulas
        .iter()
        .flat_map(|f| f.diagnostics.iter().cloned())
        .collect();

    if json {
        let out = serde_json::json!({
            "formulas": accepted
                .iter()
                .map(|f| serde_json::json!({
                    "text": f.text(),
                    "source_file": f.source_file,
                    "start_line": f.start_line,
                }))
                .collect::<Vec<_>>(),
            "diagnostics": diagnostics,
        });
        match serde_json::to_string_pretty(&out) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("E-IO: failed to encode output: {err}");
                return 1;
            }
        }
    } else {
        for formula in &accepted {
            println!("{formula}");
        }
        report(&diagnostics);
    }

    if diagnostics.iter().any(|d| !d.is_warning()) {
        1
    } else {
        0
    }
}

fn run_clausify(file: &Path) -> i32 {
    let formulas = match read_formulas(file) {
        Ok(formulas) => formulas,
        Err(diags) => {
            report(&diags);
            return 1;
        }
    };
    let mut vars = VarGen::new();
    for formula in &formulas {
        let Some(term) = formula.term() else {
            continue;
        };
        for clause in clausify(term, &mut vars).clauses {
            println!("{}", clause.to_term());
        }
    }
    0
}
