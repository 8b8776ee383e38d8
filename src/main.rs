use clap::{Parser, Subcommand};
use semicode::config::{RcConfig, RcLoader};
use semicode::controller::{CommandController, Editor, SelectionMode};
use semicode::document_model::{HandleRegistry, SemicodeError, Sequence, decode_sequence, encode};
use semicode::view::{DocumentViewModel, EditorViewModel, View};
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semicode", about = "Block documents with triples and reactive functions", version)]
struct Cli {
    /// Settings file to use instead of .semicoderc
    #[arg(long, global = true)]
    rc: Option<PathBuf>,

    /// Plain output without terminal styling
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a semicode file and draw it
    Show { file: PathBuf },
    /// Print the deduplicated triples of a semicode file
    Triples { file: PathBuf },
    /// Load a document through the editor, apply an edit script and write semicode
    Run {
        file: PathBuf,
        /// Edit script, one command per line
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Draw the edited document with its caret instead of printing semicode
        #[arg(long)]
        show: bool,
    },
    /// Wrap a plain UTF-8 text file as semicode
    Encode { file: PathBuf },
}

fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr; stdout carries documents
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("semicode=warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.rc {
        Some(path) => RcLoader::load_from(path),
        None => RcLoader::load_config(),
    };
    let mut view = View::new(RcLoader::render_options(&config));
    if cli.no_color {
        view.set_color(false);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Show { file } => show(&file, &view, &mut out)?,
        Commands::Triples { file } => triples(&file, &view, &mut out)?,
        Commands::Run { file, script, output, show } => {
            let script = script.map(fs::read_to_string).transpose()?;
            let editor = run_editor(&fs::read_to_string(&file)?, script.as_deref(), &config)?;
            let encoded = encode(editor.document(), editor.registry())?;
            match output {
                Some(path) => {
                    fs::write(&path, encoded)?;
                    info!(path = %path.display(), "wrote document");
                }
                None if !show => out.write_all(encoded.as_bytes())?,
                None => {}
            }
            if show {
                show_editor(&editor, &view, &mut out)?;
            }
        }
        Commands::Encode { file } => out.write_all(encode_text(&fs::read_to_string(&file)?)?.as_bytes())?,
    }
    out.flush()?;
    Ok(())
}

fn load(path: &Path) -> Result<(Sequence, HandleRegistry), Box<dyn Error>> {
    let mut registry = HandleRegistry::new();
    let document = decode_sequence(&fs::read_to_string(path)?, &mut registry)?;
    debug!(path = %path.display(), blocks = document.len(), "decoded");
    Ok((document, registry))
}

fn show(path: &Path, view: &View, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let (document, registry) = load(path)?;
    view.render(&DocumentViewModel::new(&document, &registry), out)?;
    writeln!(out)?;
    Ok(())
}

fn triples(path: &Path, view: &View, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let (document, registry) = load(path)?;
    view.render_triples(&DocumentViewModel::new(&document, &registry), out)?;
    Ok(())
}

fn show_editor(editor: &Editor, view: &View, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    view.render(&EditorViewModel::new(editor), out)?;
    writeln!(out)?;
    Ok(())
}

/// Pastes `text` into a fresh editor so functions recompute, then runs
/// `script` from the top of the document.
fn run_editor(text: &str, script: Option<&str>, config: &RcConfig) -> Result<Editor, Box<dyn Error>> {
    let mut editor = Editor::new();
    RcLoader::apply_config(&mut editor, config);
    editor.paste_semicode(text)?;
    editor.move_caret(0, SelectionMode::ClearSelection, None);

    if let Some(script) = script {
        let mut controller = CommandController::new();
        controller.execute_script(script, &mut editor)?;
        debug!(commands = controller.history().len(), "script finished");
    }
    Ok(editor)
}

fn run(text: &str, script: Option<&str>, config: &RcConfig) -> Result<String, Box<dyn Error>> {
    let editor = run_editor(text, script, config)?;
    Ok(encode(editor.document(), editor.registry())?)
}

fn encode_text(text: &str) -> Result<String, SemicodeError> {
    encode(&Sequence::from_text(text), &HandleRegistry::new())
}
