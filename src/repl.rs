//! Interactive terminal session.
//!
//! Reads one line at a time. A line starting with `:` is a command; any other
//! non-empty line becomes the prompt and is submitted right away. Input is not
//! read again until the submission resolves, so a request can never be
//! submitted twice.

use crate::image::{AspectRatio, DataUri, GeneratedImage, GenerationMode, ImageProvider};
use crate::session::{AppState, SubmitOutcome};
use std::fmt::Write as _;
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "\
Type a prompt and press Enter to generate (or edit, in edit mode).

Commands:
  :mode generate|edit      switch between text-to-image and generative edit
  :ratio <ratio>           aspect ratio for generated images
  :ratios                  list aspect ratios
  :upload <path>           load the image to edit
  :clear                   remove the image to edit
  :history                 list this session's images
  :select <n|id>           display a history entry
  :delete <n|id>           delete a history entry
  :edit                    edit the displayed image
  :show                    describe the displayed image
  :download [n|id] [path]  save an image (default: displayed image)
  :dismiss                 hide the last error
  :help                    show this help
  :quit                    leave the session";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Use the text as the prompt and submit.
    Submit(String),
    /// Switch generation mode.
    Mode(GenerationMode),
    /// Select an aspect ratio.
    Ratio(AspectRatio),
    /// List aspect ratios.
    Ratios,
    /// Load a source image from disk.
    Upload(PathBuf),
    /// Drop the source image.
    Clear,
    /// List history.
    History,
    /// Display a history entry.
    Select(String),
    /// Delete a history entry.
    Delete(String),
    /// Quick-edit the displayed image.
    QuickEdit,
    /// Describe the displayed image.
    Show,
    /// Save an image to disk.
    Download {
        /// History reference; the displayed image when absent.
        reference: Option<String>,
        /// File or directory; the session's download directory when absent.
        target: Option<PathBuf>,
    },
    /// Hide the error message.
    Dismiss,
    /// Print help.
    Help,
    /// End the session.
    Quit,
}

impl Command {
    /// Parses a line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(Some(Self::Submit(line.to_string())));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        let require = |what: &str| {
            if args.is_empty() {
                Err(format!("usage: :{name} <{what}>"))
            } else {
                Ok(args.to_string())
            }
        };

        let command = match name {
            "mode" => Self::Mode(
                require("generate|edit")?
                    .parse::<GenerationMode>()
                    .map_err(|e| e.to_string())?,
            ),
            "ratio" => Self::Ratio(
                require("ratio")?
                    .parse::<AspectRatio>()
                    .map_err(|e| e.to_string())?,
            ),
            "ratios" => Self::Ratios,
            "upload" => Self::Upload(PathBuf::from(require("path")?)),
            "clear" => Self::Clear,
            "history" | "ls" => Self::History,
            "select" => Self::Select(require("n|id")?),
            "delete" | "rm" => Self::Delete(require("n|id")?),
            "edit" => Self::QuickEdit,
            "show" => Self::Show,
            "download" | "save" => {
                let mut parts = args.split_whitespace();
                Self::Download {
                    reference: parts.next().map(str::to_string),
                    target: parts.next().map(PathBuf::from),
                }
            }
            "dismiss" => Self::Dismiss,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command ':{other}' (try :help)")),
        };
        Ok(Some(command))
    }
}

/// Whether the session continues after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading input.
    Continue,
    /// Stop the session.
    Quit,
}

/// An interactive session over one provider.
pub struct Repl<P> {
    provider: P,
    state: AppState,
    download_dir: PathBuf,
    auto_save: bool,
}

impl<P: ImageProvider> Repl<P> {
    /// Creates a session saving downloads to `download_dir`.
    pub fn new(provider: P, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            state: AppState::new(),
            download_dir: download_dir.into(),
            auto_save: false,
        }
    }

    /// Saves every new image to the download directory as it arrives.
    pub fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    /// Current session state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Runs until `:quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write_line(
            &mut output,
            &format!("Visionary - {} (:help for commands)", self.provider.name()),
        )
        .await?;

        let mut lines = input.lines();
        loop {
            output.write_all(self.input_marker().as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    write_line(&mut output, &format!("! {message}")).await?;
                    continue;
                }
            };
            if self.execute(command, &mut output).await? == Flow::Quit {
                break;
            }
        }

        tracing::debug!(images = self.state.history().len(), "session ended");
        Ok(())
    }

    fn input_marker(&self) -> String {
        match self.state.mode() {
            GenerationMode::Generate => format!("[generate {}]> ", self.state.aspect_ratio()),
            GenerationMode::Edit => {
                let source = if self.state.source_image().is_some() {
                    "source loaded"
                } else {
                    "no source"
                };
                format!("[edit, {source}]> ")
            }
        }
    }

    /// Applies one command, writing feedback to `out`.
    pub async fn execute<W>(&mut self, command: Command, out: &mut W) -> io::Result<Flow>
    where
        W: AsyncWrite + Unpin,
    {
        match command {
            Command::Submit(prompt) => {
                self.state.set_prompt(prompt);
                self.submit(out).await?;
            }
            Command::Mode(mode) => {
                self.state.set_mode(mode);
                let note = match mode {
                    GenerationMode::Generate => "Text to image",
                    GenerationMode::Edit if self.state.source_image().is_none() => {
                        "Generative edit - load an image with :upload or :edit"
                    }
                    GenerationMode::Edit => "Generative edit - editing maintains the original aspect ratio",
                };
                write_line(out, note).await?;
            }
            Command::Ratio(ratio) => {
                self.state.set_aspect_ratio(ratio);
                write_line(out, &format!("Aspect ratio: {ratio}")).await?;
            }
            Command::Ratios => {
                let mut text = String::new();
                for ratio in AspectRatio::ALL {
                    let marker = if ratio == self.state.aspect_ratio() { "*" } else { " " };
                    let _ = writeln!(text, " {marker} {ratio}");
                }
                out.write_all(text.as_bytes()).await?;
            }
            Command::Upload(path) => match DataUri::from_file(&path).await {
                Ok(image) => {
                    self.state.set_source_image(image);
                    let mut message = format!("Loaded {}", path.display());
                    if self.state.mode() == GenerationMode::Generate {
                        message.push_str(" (switch to edit mode with :mode edit)");
                    }
                    write_line(out, &message).await?;
                }
                Err(e) => write_line(out, &format!("! {e}")).await?,
            },
            Command::Clear => {
                self.state.clear_source_image();
                write_line(out, "Source image removed").await?;
            }
            Command::History => {
                let text = render_history(&self.state);
                out.write_all(text.as_bytes()).await?;
            }
            Command::Select(reference) => {
                match self.state.history().resolve(&reference).map(|img| img.id) {
                    Some(id) => {
                        self.state.select(id);
                        if let Some(image) = self.state.current_image() {
                            write_line(out, &describe(image)).await?;
                        }
                    }
                    None => write_line(out, &format!("! no history entry '{reference}'")).await?,
                }
            }
            Command::Delete(reference) => {
                match self.state.history().resolve(&reference).map(|img| img.id) {
                    Some(id) => {
                        if let Some(removed) = self.state.delete(id) {
                            write_line(out, &format!("Deleted {}", short_id(&removed))).await?;
                        }
                    }
                    None => write_line(out, &format!("! no history entry '{reference}'")).await?,
                }
            }
            Command::QuickEdit => {
                if self.state.quick_edit() {
                    write_line(out, "Editing the displayed image - describe the changes").await?;
                } else {
                    write_line(out, "! no image is displayed").await?;
                }
            }
            Command::Show => {
                let text = match self.state.current_image() {
                    Some(image) => describe(image),
                    None => "Nothing displayed yet - enter a prompt to start".to_string(),
                };
                write_line(out, &text).await?;
            }
            Command::Download { reference, target } => {
                self.download(reference.as_deref(), target, out).await?;
            }
            Command::Dismiss => self.state.dismiss_error(),
            Command::Help => write_line(out, HELP).await?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn submit<W>(&mut self, out: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let request = match self.state.begin_submit() {
            Ok(request) => request,
            Err(e) => return write_line(out, &format!("! {e}")).await,
        };

        write_line(out, request.mode().progress_label()).await?;
        out.flush().await?;
        let result = self.provider.generate(&request).await;

        match self.state.finish_submit(&request, result) {
            SubmitOutcome::Created(_) => {
                if let Some(image) = self.state.current_image() {
                    write_line(out, &describe(image)).await?;
                }
                if self.auto_save {
                    self.download(None, None, out).await?;
                }
            }
            SubmitOutcome::Failed(message) => {
                write_line(out, &format!("! {message}")).await?;
            }
        }
        Ok(())
    }

    async fn download<W>(
        &self,
        reference: Option<&str>,
        target: Option<PathBuf>,
        out: &mut W,
    ) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let image = match reference {
            None | Some(".") | Some("current") => self.state.current_image(),
            Some(reference) => self.state.history().resolve(reference),
        };
        let Some(image) = image else {
            return write_line(out, "! no image to download").await;
        };

        let target = target.unwrap_or_else(|| self.download_dir.clone());
        match image.save_to(&target) {
            Ok(path) => write_line(out, &format!("Saved {}", path.display())).await,
            Err(e) => write_line(out, &format!("! {e}")).await,
        }
    }
}

async fn write_line<W>(out: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await
}

fn short_id(image: &GeneratedImage) -> String {
    image.id.to_string()[..8].to_string()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

fn describe(image: &GeneratedImage) -> String {
    let ratio = image
        .aspect_ratio
        .map(|r| r.to_string())
        .unwrap_or_else(|| "edit".to_string());
    format!(
        "[{}] {} ({}, {}, {})",
        short_id(image),
        truncate(&image.prompt, 80),
        ratio,
        image.image_url.mime_type(),
        image.created_at.format("%H:%M:%S"),
    )
}

fn render_history(state: &AppState) -> String {
    let history = state.history();
    if history.is_empty() {
        return "No images yet\n".to_string();
    }
    let mut text = format!("Creation history ({} items)\n", history.len());
    for (i, image) in history.iter().enumerate() {
        let marker = if state.current_id() == Some(image.id) { "*" } else { " " };
        let ratio = image.aspect_ratio.map(|r| r.as_str()).unwrap_or("edit");
        let _ = writeln!(
            text,
            "{marker}{:>3}. [{}] {:<5} {}",
            i + 1,
            short_id(image),
            ratio,
            truncate(&image.prompt, 60)
        );
    }
    text
}
