use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use clap::Parser;
use picshare_store::config::Settings;
use picshare_store::db::schema::{entities, relationships};
use picshare_store::diagram::{render_dot, render_mermaid, DiagramFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// ER Diagram Renderer
///
/// Writes the entity-relationship diagram of the picshare schema. DOT and
/// Mermaid are written directly; PNG and SVG need Graphviz `dot` on PATH.
#[derive(Parser, Debug)]
#[command(name = "render-diagram")]
#[command(about = "Render the picshare ER diagram", long_about = None)]
struct Args {
    /// Output file (defaults to diagram.output from settings)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// dot, mermaid, png or svg (defaults to the output file extension)
    #[arg(short, long)]
    format: Option<DiagramFormat>,
}

fn render(format: DiagramFormat) -> Result<Vec<u8>> {
    let rels = relationships();
    match format {
        DiagramFormat::Dot => Ok(render_dot(entities(), &rels).into_bytes()),
        DiagramFormat::Mermaid => Ok(render_mermaid(entities(), &rels).into_bytes()),
        DiagramFormat::Png | DiagramFormat::Svg => {
            let source = render_dot(entities(), &rels);
            run_graphviz(&source, format)
        }
    }
}

/// Pipe DOT source through `dot -T<format>` and collect the image bytes
fn run_graphviz(source: &str, format: DiagramFormat) -> Result<Vec<u8>> {
    let Some(target) = format.graphviz_format() else {
        bail!("{:?} is not an image format", format);
    };

    let mut child = Command::new("dot")
        .arg(format!("-T{}", target))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to run Graphviz 'dot'; install Graphviz or use --format dot")?;

    child
        .stdin
        .take()
        .context("Failed to open stdin of 'dot'")?
        .write_all(source.as_bytes())
        .context("Failed to write diagram source to 'dot'")?;

    let output = child.wait_with_output().context("Failed to wait for 'dot'")?;
    if !output.status.success() {
        bail!(
            "'dot' exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.stdout)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// `RUST_LOG` if set, otherwise store logs at info
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "picshare_store=info".into())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let output = match args.output {
        Some(path) => path,
        None => PathBuf::from(Settings::new().context("Failed to load settings")?.diagram.output),
    };
    let format = match args.format {
        Some(format) => format,
        None => DiagramFormat::from_path(&output)?,
    };

    let bytes = render(format)?;
    write_output(&output, &bytes)?;

    println!(
        "Wrote {:?} diagram of {} entities to {}",
        format,
        entities().len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_formats_do_not_need_graphviz() {
        let dot = String::from_utf8(render(DiagramFormat::Dot).unwrap()).unwrap();
        assert!(dot.starts_with("digraph"));

        let mermaid = String::from_utf8(render(DiagramFormat::Mermaid).unwrap()).unwrap();
        assert!(mermaid.starts_with("erDiagram"));
    }

    #[test]
    fn test_graphviz_rejects_text_format() {
        assert!(run_graphviz("digraph {}", DiagramFormat::Dot).is_err());
    }

    #[test]
    fn test_write_output_creates_directories() {
        let dir = std::env::temp_dir().join(format!("picshare-diagram-{}", std::process::id()));
        let path = dir.join("out").join("schema.mmd");
        write_output(&path, b"erDiagram\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "erDiagram\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cli_parses_format() {
        let args = Args::try_parse_from(["render-diagram", "-o", "er.svg", "--format", "mermaid"])
            .expect("Failed to parse args");
        assert_eq!(args.output, Some(PathBuf::from("er.svg")));
        assert_eq!(args.format, Some(DiagramFormat::Mermaid));
    }

    #[test]
    fn test_log_filter_defaults_to_store_info() {
        if std::env::var("RUST_LOG").is_err() {
            assert_eq!(log_filter().to_string(), "picshare_store=info");
        }
    }
}
