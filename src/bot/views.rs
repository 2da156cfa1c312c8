use crate::bot::event::{Action, Button, HelpTopic, Reply};
use crate::catalog::Work;
use crate::ingest::IngestReport;
use crate::store::CatalogStats;

pub(crate) const ACCESS_DENIED: &str = "⛔ Access denied. This bot is for the administrator only.";

/// `/listcomics` splits into several messages past this many characters.
const LIST_SPLIT_CHARS: usize = 4000;
const LIST_CHUNK_LINES: usize = 20;

pub(crate) fn main_menu(stats: &CatalogStats) -> Reply {
    let text = format!(
        "👋 Welcome, Admin!\n\n📚 Comics: {}\n📖 Chapters: {}\n\nChoose an option below, or use /help for text commands.",
        stats.works, stats.chapters
    );
    Reply::text(text)
        .button("➕ Add New Comic", Action::AddWork)
        .button("📚 Manage Comics", Action::ManageWorks)
        .button("❓ Help", Action::Help)
        .button("📊 Statistics", Action::Stats)
}

pub(crate) fn back_to_menu(text: impl Into<String>) -> Reply {
    Reply::text(text).button("🏠 Main Menu", Action::MainMenu)
}

pub(crate) fn work_list(works: &[(String, Work)]) -> Reply {
    let mut reply = Reply::text("📚 Select a comic to manage:");
    for (index, (_, work)) in works.iter().enumerate() {
        reply = reply.button(
            format!("{} ({} ch)", work.title, work.chapters.len()),
            Action::Select(index),
        );
    }
    reply.button("🏠 Main Menu", Action::MainMenu)
}

pub(crate) fn work_menu(slug: &str, work: &Work) -> Reply {
    let description = if work.description.is_empty() {
        "(none)"
    } else {
        work.description.as_str()
    };
    let cover = if work.cover_reference.is_some() {
        "set"
    } else {
        "none"
    };
    let text = format!(
        "📚 \"{}\"\n\n🔗 Slug: {slug}\n📖 Chapters: {}\n🖼 Cover: {cover}\n📝 Description: {description}\n\nWhat would you like to do?",
        work.title,
        work.chapters.len()
    );
    let mut reply = Reply::text(text);
    reply.keyboard = vec![
        vec![
            Button::new("➕ Add Chapters", Action::AddChapters),
            Button::new("✏️ Edit Info", Action::EditInfo),
        ],
        vec![
            Button::new("🗑 Delete Chapter", Action::DeleteChapterMenu),
            Button::new("❌ Delete Comic", Action::DeleteWork),
        ],
        vec![Button::new("⬅️ Back", Action::ManageWorks)],
    ];
    reply
}

pub(crate) fn edit_menu(work: &Work) -> Reply {
    Reply::text(format!("✏️ Editing \"{}\"\n\nWhat should change?", work.title))
        .button("Title", Action::EditTitle)
        .button("Description", Action::EditDescription)
        .button("Cover", Action::EditCover)
        .button("⬅️ Back", Action::OpenWork)
}

pub(crate) fn chapter_method(work: &Work) -> Reply {
    Reply::text(format!(
        "📖 Add chapters to \"{}\"\n\nHow would you like to add them?",
        work.title
    ))
    .button("📦 Upload ZIP archive", Action::ChapterArchive)
    .button("🖼 Add pages one by one", Action::ChapterManual)
    .button("⬅️ Back", Action::OpenWork)
}

pub(crate) fn archive_instructions() -> Reply {
    Reply::text(
        "📦 Send a ZIP file with one folder per chapter:\n\n\
         Chapter 1/\n  page01.jpg\n  page02.jpg\n\
         Chapter 2/\n  001.png\n  002.png\n\n\
         Folder names like \"Chapter 2.5\", \"Ch 3\" or \"Episode 4\" become chapter numbers. \
         Supported images: jpg, jpeg, png, webp, gif.\n\nUse /cancel to stop.",
    )
}

/// Buttons follow `keys`; each carries its position in that list.
pub(crate) fn chapter_delete_list(work: &Work, keys: &[String]) -> Reply {
    let mut reply = Reply::text(format!(
        "🗑 Which chapter of \"{}\" should be deleted?",
        work.title
    ));
    for (index, key) in keys.iter().enumerate() {
        let pages = work.chapters.get(key).map_or(0, Vec::len);
        reply = reply.button(
            format!("Chapter {key} ({pages} pages)"),
            Action::RemoveChapter(index),
        );
    }
    reply.button("⬅️ Back", Action::OpenWork)
}

pub(crate) fn delete_confirm(title: &str, work: &Work) -> Reply {
    let text = format!(
        "⚠️ Delete \"{title}\"?\n\nThis removes {} chapters and {} pages from the catalog. This cannot be undone.",
        work.chapters.len(),
        work.page_count()
    );
    let mut reply = Reply::text(text);
    reply.keyboard = vec![vec![
        Button::new("✅ Yes, delete", Action::ConfirmDelete),
        Button::new("❌ No, keep it", Action::OpenWork),
    ]];
    reply
}

pub(crate) fn ingest_summary(title: &str, report: &IngestReport) -> String {
    let mut keys: Vec<String> = report.chapters.keys().cloned().collect();
    crate::catalog::sort_chapter_keys(&mut keys);
    let mut text = format!(
        "✅ Added {} chapters to \"{title}\"\n\n📖 Chapters: {}\n🖼 Pages: {}",
        keys.len(),
        keys.join(", "),
        report.page_count()
    );
    if report.is_partial() {
        text.push_str(&format!(
            "\n⚠️ {} files could not be uploaded and were skipped.",
            report.skipped.len()
        ));
    }
    text
}

pub(crate) fn help() -> Reply {
    Reply::text(
        "❓ Help\n\n\
         This bot manages the comic catalog. Use the menu buttons, or the commands below.\n\n\
         Pick a topic for details.",
    )
    .button("📦 Archive format", Action::HelpTopic(HelpTopic::Archive))
    .button("⌨️ Commands", Action::HelpTopic(HelpTopic::Commands))
    .button("🏠 Main Menu", Action::MainMenu)
}

pub(crate) fn help_topic(topic: HelpTopic) -> Reply {
    let text = match topic {
        HelpTopic::Archive => {
            "📦 Archive format\n\n\
             One folder per chapter at the top of the ZIP. Files directly at the top level are ignored. \
             Pages are ordered naturally (page2 before page10). Folder names such as \"Chapter 1\", \
             \"ch-07\" or \"Episode 2.5\" give the chapter number; any other name is used as-is."
        }
        HelpTopic::Commands => {
            "⌨️ Commands\n\n\
             /start - main menu\n\
             /addcomic \"Title\" - start adding a comic\n\
             /addchapter \"Title\" - add chapters to a comic\n\
             /deletecomic \"Title\" - delete a comic\n\
             /listcomics - list all comics\n\
             /stats - catalog statistics\n\
             /skip - skip the cover image\n\
             /done - finish a chapter\n\
             /cancel - cancel the current operation"
        }
    };
    Reply::text(text)
        .button("⬅️ Back to help", Action::Help)
        .button("🏠 Main Menu", Action::MainMenu)
}

pub(crate) fn stats(stats: &CatalogStats) -> Reply {
    let average = if stats.chapters == 0 {
        0.0
    } else {
        stats.pages as f64 / stats.chapters as f64
    };
    let mut text = format!(
        "📊 Statistics\n\n📚 Comics: {}\n📖 Chapters: {}\n🖼 Pages: {}\n📄 Avg pages per chapter: {average:.1}",
        stats.works, stats.chapters, stats.pages
    );
    if let Some((title, chapters)) = &stats.largest {
        text.push_str(&format!("\n🏆 Most chapters: {title} ({chapters})"));
    }
    text.push_str(&format!(
        "\n💾 Storage: {}/{} characters",
        stats.document_chars, stats.ceiling_chars
    ));
    back_to_menu(text)
}

/// Numbered catalog listing, split into several replies when long.
pub(crate) fn work_listing(works: &[(String, Work)]) -> Vec<Reply> {
    if works.is_empty() {
        return vec![Reply::text(
            "📭 No comics yet. Use /addcomic \"Title\" or the menu to add one.",
        )];
    }
    let lines: Vec<String> = works
        .iter()
        .enumerate()
        .map(|(idx, (slug, work))| {
            format!(
                "{}. {} [{slug}] - {} chapters",
                idx + 1,
                work.title,
                work.chapters.len()
            )
        })
        .collect();
    let full = format!("📚 Comics ({})\n\n{}", works.len(), lines.join("\n"));
    if full.chars().count() <= LIST_SPLIT_CHARS {
        return vec![Reply::text(full)];
    }
    lines
        .chunks(LIST_CHUNK_LINES)
        .enumerate()
        .map(|(part, chunk)| {
            Reply::text(format!("📚 Comics (part {})\n\n{}", part + 1, chunk.join("\n")))
        })
        .collect()
}
