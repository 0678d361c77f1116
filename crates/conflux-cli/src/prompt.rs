//! Interactive manual review
//!
//! [`TerminalDecider`] walks the operator through each group the engine left
//! for review. It can show the original or a candidate, open a diff tool,
//! and record one of the concrete actions. Nothing here touches the tree;
//! the choices only become plan overrides.

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use conflux_conflict::DiffTool;
use conflux_core::domain::{Action, ConflictGroup};
use conflux_core::ports::ManualDecider;
use tracing::debug;

/// Bytes of a file printed by the show commands
const SHOW_LIMIT: u64 = 16 * 1024;

/// One operator command at the review prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    ShowOriginal,
    ShowCandidate(usize),
    Diff(usize),
    KeepOriginal,
    KeepCandidate(usize),
    KeepBoth,
    Skip,
    Help,
}

/// Parses a prompt answer; candidate numbers are 1-based on input, 0-based out
fn parse_choice(input: &str, candidates: usize) -> Option<Choice> {
    let mut words = input.split_whitespace();
    let command = words.next()?;
    let number = |word: Option<&str>| -> Option<usize> {
        let n: usize = word?.parse().ok()?;
        (1..=candidates).contains(&n).then(|| n - 1)
    };

    let choice = match command {
        "o" | "original" => Choice::ShowOriginal,
        "c" | "show" => Choice::ShowCandidate(number(words.next())?),
        "d" | "diff" => Choice::Diff(number(words.next())?),
        "k" | "keep" => Choice::KeepOriginal,
        "b" | "both" => Choice::KeepBoth,
        "s" | "skip" | "q" => Choice::Skip,
        "?" | "h" | "help" => Choice::Help,
        other => Choice::KeepCandidate(number(Some(other))?),
    };
    if words.next().is_some() {
        return None;
    }
    Some(choice)
}

/// Prompts on the controlling terminal
pub struct TerminalDecider {
    diff_tool: Option<String>,
}

impl TerminalDecider {
    pub fn new(diff_tool: Option<String>) -> Self {
        Self { diff_tool }
    }
}

#[async_trait::async_trait]
impl ManualDecider for TerminalDecider {
    async fn decide(&self, group: &ConflictGroup) -> Result<Option<Action>> {
        let group = group.clone();
        let diff_tool = self.diff_tool.clone();
        tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            review(&group, diff_tool.as_deref(), &mut input, &mut output)
        })
        .await
        .context("Prompt task failed")?
    }
}

/// Runs the review dialogue for one group until the operator decides
///
/// End of input counts as skip.
fn review<R: BufRead, W: Write>(
    group: &ConflictGroup,
    diff_tool: Option<&str>,
    input: &mut R,
    out: &mut W,
) -> Result<Option<Action>> {
    describe(group, out)?;

    loop {
        write!(out, "choice [N/o/c N/d N/k/b/s/?]: ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(None);
        }

        let Some(choice) = parse_choice(&line, group.len()) else {
            writeln!(out, "unrecognized choice; type ? for help")?;
            continue;
        };
        debug!(?choice, original = %group.original_path().display(), "Prompt choice");

        match choice {
            Choice::ShowOriginal => {
                if group.original_exists() {
                    show(group.original_path(), out)?;
                } else {
                    writeln!(out, "the original no longer exists")?;
                }
            }
            Choice::ShowCandidate(i) => show(group.artifacts()[i].conflict_path(), out)?,
            Choice::Diff(i) => {
                let candidate = group.artifacts()[i].conflict_path();
                let other = if group.original_exists() {
                    group.original_path()
                } else {
                    let latest = group.latest().conflict_path();
                    if latest == candidate {
                        group.artifacts()[0].conflict_path()
                    } else {
                        latest
                    }
                };
                if other == candidate {
                    writeln!(out, "nothing to compare against")?;
                    continue;
                }
                match DiffTool::detect(diff_tool).and_then(|tool| tool.launch(other, candidate)) {
                    Ok(()) => {}
                    Err(e) => writeln!(out, "{e}")?,
                }
            }
            Choice::KeepOriginal => {
                if group.original_exists() {
                    return Ok(Some(Action::KeepOriginal));
                }
                writeln!(out, "the original no longer exists; keep a candidate instead")?;
            }
            Choice::KeepCandidate(i) => {
                let winner = group.artifacts()[i].conflict_path().to_path_buf();
                return Ok(Some(Action::KeepConflict(winner)));
            }
            Choice::KeepBoth => return Ok(Some(Action::KeepBoth)),
            Choice::Skip => return Ok(None),
            Choice::Help => help(out)?,
        }
    }
}

fn describe<W: Write>(group: &ConflictGroup, out: &mut W) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", group.original_path().display())?;
    match group.original() {
        Some(stat) => writeln!(
            out,
            "  original: {} bytes{}",
            stat.size,
            stat.modified
                .map(|m| format!(", modified {}", m.format("%Y-%m-%d %H:%M:%S")))
                .unwrap_or_default()
        )?,
        None => writeln!(out, "  original: missing")?,
    }
    for (i, artifact) in group.artifacts().iter().enumerate() {
        writeln!(
            out,
            "  [{}] {}  device {}  {}  {} bytes{}",
            i + 1,
            artifact.file_name(),
            artifact.device(),
            artifact.timestamp().date_label(),
            artifact.size(),
            artifact
                .modified()
                .map(|m| format!(", modified {}", m.format("%Y-%m-%d %H:%M:%S")))
                .unwrap_or_default()
        )?;
    }
    Ok(())
}

fn help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "  N      keep candidate N, replacing the original")?;
    writeln!(out, "  o      show the original")?;
    writeln!(out, "  c N    show candidate N")?;
    writeln!(out, "  d N    diff candidate N against the original")?;
    writeln!(out, "  k      keep the original, discarding every candidate")?;
    writeln!(out, "  b      keep both, renaming candidates beside the original")?;
    writeln!(out, "  s      skip, leaving the group for later")
}

/// Prints the head of `path`; a file that vanished or cannot be read is
/// reported and the prompt continues
fn show<W: Write>(path: &Path, out: &mut W) -> io::Result<()> {
    let body = match read_head(path) {
        Ok(body) => body,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Cannot show file");
            return writeln!(out, "cannot show {}: {e}", path.display());
        }
    };
    writeln!(out, "----- {}", path.display())?;
    out.write_all(String::from_utf8_lossy(&body).as_bytes())?;
    if !body.ends_with(b"\n") {
        writeln!(out)?;
    }
    writeln!(out, "-----")
}

fn read_head(path: &Path) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    File::open(path)?.take(SHOW_LIMIT).read_to_end(&mut body)?;
    Ok(body)
}
