//! Shell command - drive a viewer one line at a time
//!
//! Nodes are addressed by the ids printed by `tree` (`#3` or `3`). Commands
//! that start a load wait until the viewer is idle again before the next
//! line is read.

use crate::{
    Result, TreeViewerError,
    browser::{Browser, BrowserKind, BrowserNode},
    config::ViewerConfig,
    model::{DataObject, GroupId, NodeId, TreeNode, TreeVisitor, UserId},
    service::{DataService, MemoryService, Scope},
    ui::{AlwaysConfirm, Answer, ConfirmationPolicy, DialoguerConfirm, StdoutNotifier},
    viewer::{CommandOutcome, CopyMode, SessionId, SessionRegistry, TreeViewer, ViewerError},
};
use clap::ValueEnum;
use colored::Colorize;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const HELP: &str = "\
browser <kind>        switch to a browser (container-explorer, tag-explorer, ...)
show <kind>           toggle whether a browser is displayed
refresh               reload the top level of the current browser
select <node>...      select nodes
browse <node>         open a node and load its contents
expand <node>         load a node's children in the background
copy | cut            put the selection in the copy buffer
paste                 paste the copy buffer into the selection
delete                delete the selection
thumbs <node>         load thumbnails for an image or its container
render copy <node>    copy an image's rendering settings
render paste|reset    apply or reset rendering settings on the selection
user <id> | group <id>  browse another user's or group's data
finder on|off         show or hide the finder
cancel                cancel running loads
state | tree | help | quit";

/// Options of the shell subcommand
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub script: Option<PathBuf>,
    pub yes: bool,
    pub data: Option<PathBuf>,
    pub browser: Option<BrowserKind>,
    pub scope: Scope,
    pub quiet: bool,
}

/// One parsed shell line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Browser(BrowserKind),
    Show(BrowserKind),
    Refresh,
    Select(Vec<NodeId>),
    Browse(NodeId),
    Expand(NodeId),
    Copy(CopyMode),
    Paste,
    Delete,
    Thumbs(NodeId),
    RenderCopy(NodeId),
    RenderPaste,
    RenderReset,
    User(UserId),
    Group(GroupId),
    Finder(bool),
    Cancel,
    State,
    Tree,
    Help,
    Quit,
}

fn invalid(message: impl Into<String>) -> TreeViewerError {
    TreeViewerError::InvalidInput(message.into())
}

fn parse_kind(word: &str) -> Result<BrowserKind> {
    <BrowserKind as ValueEnum>::from_str(word, true)
        .map_err(|_| invalid(format!("Unknown browser: '{word}'")))
}

fn parse_node(word: &str) -> Result<NodeId> {
    word.trim_start_matches('#')
        .parse()
        .map(NodeId)
        .map_err(|_| invalid(format!("Not a node id: '{word}'")))
}

fn parse_id(word: &str) -> Result<i64> {
    word.parse()
        .map_err(|_| invalid(format!("Not an id: '{word}'")))
}

/// Parse one line; blank lines and `#` comments give `None`
///
/// # Errors
///
/// Returns `TreeViewerError::InvalidInput` for an unknown command or a bad
/// argument.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    let command = match (verb, args.as_slice()) {
        ("browser", [kind]) => ShellCommand::Browser(parse_kind(kind)?),
        ("show", [kind]) => ShellCommand::Show(parse_kind(kind)?),
        ("refresh", []) => ShellCommand::Refresh,
        ("select", nodes) if !nodes.is_empty() => ShellCommand::Select(
            nodes
                .iter()
                .map(|node| parse_node(node))
                .collect::<Result<_>>()?,
        ),
        ("browse", [node]) => ShellCommand::Browse(parse_node(node)?),
        ("expand", [node]) => ShellCommand::Expand(parse_node(node)?),
        ("copy", []) => ShellCommand::Copy(CopyMode::Copy),
        ("cut", []) => ShellCommand::Copy(CopyMode::Cut),
        ("paste", []) => ShellCommand::Paste,
        ("delete", []) => ShellCommand::Delete,
        ("thumbs", [node]) => ShellCommand::Thumbs(parse_node(node)?),
        ("render", ["copy", node]) => ShellCommand::RenderCopy(parse_node(node)?),
        ("render", ["paste"]) => ShellCommand::RenderPaste,
        ("render", ["reset"]) => ShellCommand::RenderReset,
        ("user", [id]) => ShellCommand::User(UserId(parse_id(id)?)),
        ("group", [id]) => ShellCommand::Group(GroupId(parse_id(id)?)),
        ("finder", ["on"]) => ShellCommand::Finder(true),
        ("finder", ["off"]) => ShellCommand::Finder(false),
        ("cancel", []) => ShellCommand::Cancel,
        ("state", []) => ShellCommand::State,
        ("tree", []) => ShellCommand::Tree,
        ("help", []) => ShellCommand::Help,
        ("quit" | "exit", []) => ShellCommand::Quit,
        _ => return Err(invalid(format!("Unknown command: '{line}' (try 'help')"))),
    };
    Ok(Some(command))
}

/// Collects one indented line per node
struct TreePrinter<'a> {
    selection: &'a [NodeId],
    lines: Vec<String>,
}

impl TreeVisitor<BrowserNode> for TreePrinter<'_> {
    fn visit(&mut self, node: &TreeNode<BrowserNode>, depth: usize) {
        let payload = &node.payload;
        let object = &payload.object;
        let marker = if self.selection.contains(&node.id) { ">" } else { " " };
        let mut line = format!(
            "{marker} {}{} {} {}",
            "  ".repeat(depth),
            node.id.to_string().dimmed(),
            object.kind.label().cyan(),
            object.name
        );
        if !payload.children_loaded {
            let _ = write!(line, " {}", format!("({})", object.child_count).dimmed());
        }
        if payload.cut {
            let _ = write!(line, " {}", "[cut]".yellow());
        }
        if payload.thumbnail.is_some() {
            let _ = write!(line, " {}", "[thumbnail]".green());
        }
        self.lines.push(line);
    }
}

/// Render a browser's loaded tree
#[must_use]
pub fn render_tree(browser: &dyn Browser) -> Vec<String> {
    let selection = browser.selected_displays();
    let mut printer = TreePrinter {
        selection: &selection,
        lines: Vec::new(),
    };
    browser.accept(&mut printer);
    printer.lines
}

/// A viewer session driven by text commands
pub struct Shell {
    sessions: SessionRegistry,
    session: SessionId,
    quiet: bool,
    timeout: Duration,
}

impl Shell {
    /// Take ownership of an activated viewer
    #[must_use]
    pub fn new(viewer: TreeViewer, quiet: bool) -> Self {
        let mut sessions = SessionRegistry::new();
        let session = sessions.create(viewer);
        Self {
            sessions,
            session,
            quiet,
            timeout: Duration::from_secs(30),
        }
    }

    /// How long a command may wait for its loads
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn viewer(&self) -> Option<&TreeViewer> {
        self.sessions.get(self.session)
    }

    fn viewer_mut(&mut self) -> Result<&mut TreeViewer> {
        self.sessions
            .get_mut(self.session)
            .ok_or_else(|| invalid("The viewer session has ended"))
    }

    /// Read commands until `quit` or end of input, then discard the viewer
    ///
    /// Viewer errors are printed and the shell carries on.
    ///
    /// # Errors
    ///
    /// Returns an error if reading input or writing output fails.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            let command = match parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "{} {e}", "error:".red())?;
                    continue;
                }
            };
            if command == ShellCommand::Quit {
                break;
            }
            match self.execute(&command, out) {
                Ok(()) => {}
                Err(TreeViewerError::ViewerError(e)) => {
                    writeln!(out, "{} {e}", "error:".red())?;
                }
                Err(e) => return Err(e),
            }
        }
        self.sessions.discard(self.session);
        Ok(())
    }

    /// Execute one command against the viewer
    ///
    /// # Errors
    ///
    /// Returns viewer errors and output failures.
    pub fn execute<W: Write>(&mut self, command: &ShellCommand, out: &mut W) -> Result<()> {
        debug!(?command, "Shell command");
        let quiet = self.quiet;
        let timeout = self.timeout;
        let viewer = self.viewer_mut()?;
        let kind = viewer
            .selected_browser()
            .ok_or(ViewerError::IllegalState {
                operation: "run shell commands",
                state: viewer.state(),
            })?;

        let outcome = match command {
            ShellCommand::Browser(target) => viewer.set_selected_browser(*target)?,
            ShellCommand::Show(target) => {
                let displayed = viewer.display_browser(*target)?;
                if !quiet {
                    let word = if displayed { "shown" } else { "hidden" };
                    writeln!(out, "{target} {word}")?;
                }
                CommandOutcome::Completed
            }
            ShellCommand::Refresh => viewer.refresh_tree()?,
            ShellCommand::Select(nodes) => viewer.select_nodes(kind, nodes)?,
            ShellCommand::Browse(node) => viewer.browse(kind, *node)?,
            ShellCommand::Expand(node) => viewer.expand_node(kind, *node)?,
            ShellCommand::Copy(mode) => viewer.copy_selection(*mode)?,
            ShellCommand::Paste => viewer.paste_into_selection()?,
            ShellCommand::Delete => viewer.delete_selection()?,
            ShellCommand::Thumbs(node) => viewer.retrieve_thumbnails(kind, *node)?,
            ShellCommand::RenderCopy(node) => {
                let object = node_object(viewer, kind, *node)?;
                viewer.copy_rendering_settings(&object)?
            }
            ShellCommand::RenderPaste => {
                let targets = selection(viewer, kind);
                viewer.paste_rendering_settings(&targets)?
            }
            ShellCommand::RenderReset => {
                let targets = selection(viewer, kind);
                viewer.reset_rendering_settings(&targets)?
            }
            ShellCommand::User(user) => viewer.set_user(*user)?,
            ShellCommand::Group(group) => viewer.set_group(*group)?,
            ShellCommand::Finder(visible) => {
                viewer.show_finder(*visible)?;
                CommandOutcome::Completed
            }
            ShellCommand::Cancel => {
                viewer.cancel();
                CommandOutcome::Completed
            }
            ShellCommand::State => {
                let loader = viewer
                    .pending_loader()
                    .map_or_else(|| "none".to_string(), |id| id.to_string());
                writeln!(
                    out,
                    "state: {}, browser: {kind}, loader: {loader}, scope: {} {}",
                    viewer.state().to_string().bold(),
                    viewer.scope().user,
                    viewer.scope().group
                )?;
                CommandOutcome::Completed
            }
            ShellCommand::Tree => {
                if let Some(browser) = viewer.browser(kind) {
                    for line in render_tree(browser) {
                        writeln!(out, "{line}")?;
                    }
                }
                CommandOutcome::Completed
            }
            ShellCommand::Help => {
                writeln!(out, "{HELP}")?;
                CommandOutcome::Completed
            }
            ShellCommand::Quit => CommandOutcome::Completed,
        };

        debug!(?outcome, "Shell command finished");
        if !viewer.wait_idle(timeout) && !quiet {
            writeln!(out, "Still loading; use 'cancel' to stop")?;
        }
        Ok(())
    }
}

fn node_object(viewer: &TreeViewer, kind: BrowserKind, node: NodeId) -> Result<DataObject> {
    viewer
        .browser(kind)
        .and_then(|browser| browser.node(node))
        .map(|n| n.object.clone())
        .ok_or_else(|| ViewerError::UnknownNode { browser: kind, node }.into())
}

fn selection(viewer: &TreeViewer, kind: BrowserKind) -> Vec<DataObject> {
    viewer
        .browser(kind)
        .map(|browser| browser.selected_objects())
        .unwrap_or_default()
}

/// Execute the shell command
///
/// Builds a viewer over the sample data (or `--data`), activates it, loads
/// the top level and runs commands from the script or stdin.
///
/// # Errors
///
/// Returns an error if the data file cannot be read, the viewer cannot be
/// built, or input/output fails.
pub fn execute(mut config: ViewerConfig, options: ShellOptions) -> Result<()> {
    let service: Arc<dyn DataService> = match &options.data {
        Some(path) => Arc::new(MemoryService::from_json(&fs::read_to_string(path)?)?),
        None => Arc::new(MemoryService::sample()),
    };

    if let Some(kind) = options.browser {
        if !config.browsers.contains(&kind) {
            config.browsers.push(kind);
        }
        config.default_browser = kind;
    }

    let confirmation: Box<dyn ConfirmationPolicy> = if options.yes {
        Box::new(AlwaysConfirm::new(Answer::Yes))
    } else {
        Box::new(DialoguerConfirm::new())
    };

    let mut viewer = TreeViewer::builder(service, options.scope)
        .config(config)
        .notifier(Box::new(StdoutNotifier::new()))
        .confirmation(confirmation)
        .build()?;
    viewer.activate()?;
    viewer.refresh_tree()?;

    let mut shell = Shell::new(viewer, options.quiet);
    let mut out = io::stdout().lock();
    if !options.quiet && options.script.is_none() {
        writeln!(out, "Type 'help' for commands, 'quit' to leave.")?;
    }
    if let Some(viewer) = shell.sessions.get_mut(shell.session) {
        viewer.wait_idle(shell.timeout);
    }

    match &options.script {
        Some(path) => shell.run(BufReader::new(File::open(path)?), &mut out),
        None => shell.run(io::stdin().lock(), &mut out),
    }
}
