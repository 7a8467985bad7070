//! Command-line front end: compiles the semantics of an architecture document.
//!
//! Build with `cargo run --features cli --bin semgen -- path/to/arch.json`.

#[cfg(not(feature = "cli"))]
pub fn main() {
    eprintln!(
        "The 'semgen' binary requires the 'cli' feature. \
Enable it with `cargo run --features cli --bin semgen -- <DOCUMENT>`."
    );
    std::process::exit(1);
}

#[cfg(feature = "cli")]
fn main() {
    env_logger::init();
    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
mod cli {
    use std::io::{self, Write};
    use std::path::PathBuf;

    use anyhow::{Context, bail};
    use clap::Parser;

    use semgen::SemanticCompiler;
    use semgen::loader::{ArchitectureDocument, generate_all};

    #[derive(Debug, Parser)]
    #[command(
        name = "semgen",
        version,
        about = "Generate expression-building C++ from instruction semantics"
    )]
    struct Args {
        /// Architecture document (JSON).
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,
        /// Only compile the opcode with this mnemonic.
        #[arg(long, value_name = "MNEMONIC")]
        opcode: Option<String>,
        /// Print the SHA-256 of each block instead of its text.
        #[arg(long)]
        digest: bool,
    }

    pub fn run() -> anyhow::Result<()> {
        let args = Args::parse();
        let doc = ArchitectureDocument::load(&args.document)
            .with_context(|| format!("loading {}", args.document.display()))?;

        let stdout = io::stdout();
        let mut out = stdout.lock();

        if let Some(mnemonic) = &args.opcode {
            let Some(desc) = doc.opcode(mnemonic) else {
                bail!("{}: no opcode named '{mnemonic}'", doc.name());
            };
            let table = doc.identifier_table();
            let block = SemanticCompiler::new(&table).compile(desc)?;
            emit(&mut out, mnemonic, &block, args.digest)?;
            return Ok(());
        }

        let output = generate_all(&doc);
        for (mnemonic, block) in &output.blocks {
            emit(&mut out, mnemonic, block, args.digest)?;
        }
        for failure in &output.failures {
            eprintln!("error: {failure}");
        }
        if !output.is_clean() {
            bail!(
                "{}: {} of {} opcode(s) failed",
                doc.name(),
                output.failures.len(),
                doc.opcodes.len()
            );
        }
        Ok(())
    }

    fn emit(
        out: &mut impl Write,
        mnemonic: &str,
        block: &semgen::SemanticBlock,
        digest: bool,
    ) -> io::Result<()> {
        if digest {
            let hex: String = block
                .fingerprint()
                .iter()
                .map(|byte| format!("{byte:02x}"))
                .collect();
            return writeln!(out, "{hex}  {mnemonic}");
        }
        if block.is_empty() {
            return Ok(());
        }
        writeln!(out, "// {mnemonic}")?;
        write!(out, "{block}")
    }
}
