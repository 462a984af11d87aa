use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Path of the TOML config file (default: <project>/.repopack.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub no_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(
        short = 'i',
        long = "ignore",
        value_name = "PATTERNS",
        action = clap::ArgAction::Append,
        help = "Extra ignore patterns, comma separated; prefix with '!' to re-include (repeatable).",
        help_heading = "Ignore Rules"
    )]
    pub ignore: Vec<String>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Apply a named preset (default, docs-only, code-only, tests-only).",
        help_heading = "Ignore Rules"
    )]
    pub preset: Option<String>,

    #[arg(
        long,
        help = "Do not read .gitignore from the source root.",
        help_heading = "Ignore Rules"
    )]
    pub no_gitignore: bool,

    #[arg(
        long,
        help = "Do not read .repomixignore from the source root.",
        help_heading = "Ignore Rules"
    )]
    pub no_repomixignore: bool,

    #[arg(
        long,
        help = "Disable the built-in default ignores (node_modules, lockfiles, images, ...).",
        help_heading = "Ignore Rules"
    )]
    pub no_builtin_ignore: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Pack a repository into a single AI-ready document.",
    long_about = "repopack collects the text files of a local directory or a GitHub repository, \nfilters them through ignore rules and emits one <repository_context> document \nwith an optional directory tree and per-file CDATA records.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  repopack pack . -o context.xml\n  repopack pack https://github.com/owner/repo/tree/main/src --prompt-id explain\n  repopack check src/main.rs node_modules/x.js\n  repopack show presets",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(visible_alias = "p", about = "Pack a directory or GitHub repository into one document.")]
    Pack(PackArgs),

    #[command(visible_alias = "t", about = "Print the tree of files that would be packed.")]
    Tree(TreeArgs),

    #[command(visible_alias = "c", about = "Explain whether paths are ignored and which rule decided.")]
    Check(CheckArgs),

    #[command(visible_alias = "u", about = "List or extract the files stored in a packed document.")]
    Unpack(UnpackArgs),

    #[command(
        visible_alias = "s",
        about = "Show built-in presets, prompts and default ignores."
    )]
    Show(ShowArgs),

    #[command(
        visible_alias = "m",
        about = "Show per-file character and token figures for a source."
    )]
    Metrics(MetricsArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),

    #[command(about = "Show or save the default configuration file.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SourceArg {
    #[arg(
        default_value = ".",
        value_name = "SOURCE",
        help = "Local directory, or GitHub repository (owner/repo, github.com/owner/repo[/tree/<branch>/<path>])."
    )]
    pub source: String,
}

#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    #[clap(flatten)]
    pub source: SourceArg,
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,

    #[arg(
        long,
        value_name = "TEXT",
        conflicts_with = "prompt_id",
        help = "Instruction text placed before the document.",
        help_heading = "Document"
    )]
    pub prompt: Option<String>,

    #[arg(
        long,
        value_name = "ID",
        help = "Use a predefined prompt (readme, wins, arch, audit, explain).",
        help_heading = "Document"
    )]
    pub prompt_id: Option<String>,

    #[arg(long, help = "Omit the <file_tree> block.", help_heading = "Document")]
    pub no_tree: bool,

    #[arg(
        long,
        help = "List directories before files in the tree.",
        help_heading = "Document"
    )]
    pub folders_first: bool,

    #[arg(
        long,
        help = "Accepted for compatibility; file bodies are not modified.",
        help_heading = "Document"
    )]
    pub remove_comments: bool,

    #[arg(
        long,
        value_name = "TOKENIZER",
        value_parser = ["chars", "cl100k"],
        help = "Token estimator for the statistics [default: chars].",
        help_heading = "Document"
    )]
    pub tokenizer: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the document to FILE instead of stdout.",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FORMAT",
        value_parser = ["table", "json", "none"],
        default_value = "table",
        help = "How to print run statistics on stderr.",
        help_heading = "Output Control"
    )]
    pub stats_format: String,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub source: SourceArg,
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(long, help = "List directories before files.")]
    pub folders_first: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(required = true, value_name = "PATH", help = "Relative paths to evaluate (need not exist).")]
    pub paths: Vec<String>,

    #[arg(
        short = 's',
        long,
        default_value = ".",
        value_name = "SOURCE",
        help = "Source whose ignore files take part in the rules."
    )]
    pub source: String,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct UnpackArgs {
    #[arg(value_name = "FILE", help = "Packed document to read ('-' for stdin).")]
    pub file: String,

    #[arg(
        short = 'x',
        long,
        value_name = "DIR",
        help = "Write every file record below DIR."
    )]
    pub extract: Option<PathBuf>,

    #[arg(long, help = "Overwrite existing files when extracting.")]
    pub force: bool,

    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
    #[command(subcommand)]
    pub item: ShowItem,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ShowItem {
    #[command(about = "Show one preset's patterns.")]
    Preset { name: String },
    #[command(about = "List the available presets.")]
    Presets {},
    #[command(about = "Show one predefined prompt's text.")]
    Prompt { id: String },
    #[command(about = "List the predefined prompts.")]
    Prompts {},
    #[command(about = "Show the built-in default ignore patterns.")]
    Defaults {},
}

#[derive(Args, Debug, Clone)]
pub struct MetricsArgs {
    #[clap(flatten)]
    pub source: SourceArg,
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub filters: FilterOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        value_name = "TOKENIZER",
        value_parser = ["chars", "cl100k"],
        help = "Token estimator [default: from config, else chars]."
    )]
    pub tokenizer: Option<String>,

    #[arg(long, value_name = "N", help = "Only list the N largest files by tokens.")]
    pub top: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Save the default config to .repopack.toml in the current directory (prompts overwrite)."
    )]
    pub save: bool,
}
