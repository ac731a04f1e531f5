mod config;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Command, Config};
use docx_splice::{
    CommentOptions, DocxEditor, NoteOptions, PageNumberOptions, ParagraphOptions, RunFormat, TocOptions,
    TrackedDeleteOptions, TrackedInsertOptions, WatermarkOptions,
};

/// Element counts printed by `info`.
#[derive(Debug, Serialize)]
struct DocumentInfo {
    paragraphs: usize,
    tables: usize,
    images: usize,
    charts: usize,
    comments: usize,
    styles: usize,
    toc_entries: usize,
}

impl DocumentInfo {
    fn collect(editor: &DocxEditor) -> anyhow::Result<Self> {
        Ok(Self {
            paragraphs: editor.paragraph_count()?,
            tables: editor.table_count()?,
            images: editor.image_count()?,
            charts: editor.chart_count()?,
            comments: editor.comments()?.len(),
            styles: editor.style_ids()?.len(),
            toc_entries: editor.toc_entries()?.len(),
        })
    }
}

fn run(editor: &mut DocxEditor, command: Command) -> anyhow::Result<()> {
    match command {
        Command::MergeHorizontal {
            table,
            row,
            start_col,
            end_col,
        } => editor.merge_cells_horizontal(table, row, start_col, end_col)?,
        Command::MergeVertical {
            table,
            start_row,
            end_row,
            col,
        } => editor.merge_cells_vertical(table, start_row, end_row, col)?,
        Command::DeleteTable { table } => editor.delete_table(table)?,
        Command::UpdateCell { table, row, col, text } => editor.update_table_cell(table, row, col, &text)?,
        Command::Comment { anchor, text, initials } => {
            let id = editor.insert_comment(CommentOptions {
                text,
                anchor,
                author: None,
                initials,
            })?;
            info!("Comment id {}", id);
        }
        Command::Footnote { anchor, text } => {
            let id = editor.insert_footnote(NoteOptions::new(text, anchor))?;
            info!("Footnote id {}", id);
        }
        Command::Endnote { anchor, text } => {
            let id = editor.insert_endnote(NoteOptions::new(text, anchor))?;
            info!("Endnote id {}", id);
        }
        Command::Paragraph {
            text,
            style,
            bold,
            italic,
            underline,
            tracked,
            position,
        } => {
            let format = RunFormat {
                bold,
                italic,
                underline,
                ..RunFormat::default()
            };
            if tracked {
                editor.insert_tracked_text(TrackedInsertOptions {
                    text,
                    style,
                    format,
                    position: position.position(),
                    ..TrackedInsertOptions::default()
                })?;
            } else {
                editor.insert_paragraph(ParagraphOptions {
                    text,
                    style,
                    format,
                    position: position.position(),
                    ..ParagraphOptions::default()
                })?;
            }
        }
        Command::Toc {
            title,
            no_title,
            levels,
            refresh,
        } => {
            if refresh {
                editor.mark_toc_dirty()?;
            } else {
                editor.insert_toc(TocOptions {
                    title: (!no_title).then_some(title),
                    levels,
                    ..TocOptions::default()
                })?;
            }
        }
        Command::Watermark {
            text,
            color,
            font,
            opacity,
            horizontal,
        } => {
            editor.set_text_watermark(WatermarkOptions {
                text,
                font,
                color,
                opacity,
                diagonal: !horizontal,
            })?;
        }
        Command::PageNumbers { start, format } => editor.set_page_numbering(PageNumberOptions { start, format })?,
        Command::TrackDelete { anchor } => editor.delete_tracked_text(TrackedDeleteOptions::new(anchor))?,
        Command::Info => {
            let info = DocumentInfo::collect(editor)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `info` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let mut editor = DocxEditor::open(&config.input)
        .with_context(|| format!("Failed to open {}", config.input.display()))?
        .with_author(config.author.clone());

    let writes = config.command.writes();
    run(&mut editor, config.command.clone()).context("Edit failed")?;

    if writes {
        let output = config.output();
        editor
            .save(output)
            .with_context(|| format!("Failed to save {}", output.display()))?;
        info!("Saved {}", output.display());
    }
    Ok(())
}
