use crate::cli_args::{ShowArgs, ShowItem};
use crate::output::print_data_or_text;
use anyhow::Result;
use colored::*;
use repopack_core::presets;

pub fn handle_show_command(args: ShowArgs) -> Result<()> {
    let format = &args.format_output;
    match &args.item {
        ShowItem::Preset { name } => {
            let preset = presets::find_preset(name)?;
            print_data_or_text(preset, Some(preset.patterns.join("\n")), format, "text")
        }
        ShowItem::Presets {} => {
            let all = presets::presets();
            let text = all
                .iter()
                .map(|p| {
                    format!(
                        "{:<12} {} {}",
                        p.name.blue(),
                        p.description,
                        format!("({} patterns)", p.patterns.len()).dimmed()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            print_data_or_text(&all, Some(text), format, "text")
        }
        ShowItem::Prompt { id } => {
            let prompt = presets::find_prompt(id)?;
            print_data_or_text(prompt, Some(prompt.text.clone()), format, "text")
        }
        ShowItem::Prompts {} => {
            let all = presets::predefined_prompts();
            let text = all
                .iter()
                .map(|p| format!("{:<8} {}", p.id.blue(), p.label))
                .collect::<Vec<_>>()
                .join("\n");
            print_data_or_text(&all, Some(text), format, "text")
        }
        ShowItem::Defaults {} => {
            let defaults = presets::builtin_defaults();
            print_data_or_text(&defaults, Some(defaults.join("\n")), format, "text")
        }
    }
}
