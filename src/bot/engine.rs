use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use regex::Regex;

use crate::bot::auth::AdminGuard;
use crate::bot::event::{self, Action, ActorId, Event, Reply};
use crate::bot::session::{Session, StateKind};
use crate::bot::views;
use crate::catalog::{self, Work};
use crate::ingest::IngestionPipeline;
use crate::objects::ObjectStore;
use crate::store::{ContentStore, StoreError};

static QUOTED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"([^"]+)"$"#).expect("quoted title regex is valid"));

/// How an event was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Input accepted; the session moved on (or looped while collecting).
    Advanced,
    /// Input rejected; the same state is re-entered with a corrective prompt.
    Reprompted,
    /// A catalog mutation was committed and the session cleared.
    Committed,
    /// A command refused before any session started (bad arguments, unknown title).
    Rejected,
    /// The referenced work or chapter no longer exists; the session was cleared.
    NotFound,
    /// Archive ingestion produced nothing; the archive state is re-entered.
    Failed,
    Cancelled,
    Unauthorized,
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub replies: Vec<Reply>,
    pub state: StateKind,
    pub outcome: Outcome,
}

struct Step {
    next: Session,
    replies: Vec<Reply>,
    outcome: Outcome,
}

impl Step {
    fn new(next: Session, outcome: Outcome, reply: Reply) -> Self {
        Self {
            next,
            replies: vec![reply],
            outcome,
        }
    }

    fn advance(next: Session, reply: Reply) -> Self {
        Self::new(next, Outcome::Advanced, reply)
    }

    fn reprompt(current: Session, reply: Reply) -> Self {
        Self::new(current, Outcome::Reprompted, reply)
    }
}

/// Per-actor conversation state machine over the content store.
///
/// Each actor's session sits behind its own async mutex held for the whole
/// handling of an event, so one actor's events never interleave while
/// different actors proceed independently.
pub struct ConversationEngine {
    guard: AdminGuard,
    store: Arc<ContentStore>,
    objects: Arc<dyn ObjectStore>,
    pipeline: IngestionPipeline,
    sessions: Mutex<HashMap<ActorId, Arc<tokio::sync::Mutex<Session>>>>,
}

impl ConversationEngine {
    pub fn new(guard: AdminGuard, store: Arc<ContentStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            guard,
            store,
            pipeline: IngestionPipeline::new(Arc::clone(&objects)),
            objects,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn guard(&self) -> &AdminGuard {
        &self.guard
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    pub async fn state_of(&self, actor: ActorId) -> StateKind {
        self.session_slot(actor).lock().await.kind()
    }

    pub async fn handle(&self, actor: ActorId, event: Event) -> Turn {
        if let Err(err) = self.guard.check(actor) {
            tracing::warn!(actor, %err, "rejected event from unauthorized actor");
            return Turn {
                replies: vec![Reply::text(views::ACCESS_DENIED)],
                state: StateKind::SelectingAction,
                outcome: Outcome::Unauthorized,
            };
        }

        let slot = self.session_slot(actor);
        let mut session = slot.lock().await;
        let current = std::mem::take(&mut *session);
        let from = current.kind();
        let step = self.step(current, event).await;
        *session = step.next;
        tracing::debug!(actor, ?from, to = ?session.kind(), outcome = ?step.outcome, "handled event");
        Turn {
            replies: step.replies,
            state: session.kind(),
            outcome: step.outcome,
        }
    }

    fn session_slot(&self, actor: ActorId) -> Arc<tokio::sync::Mutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(sessions.entry(actor).or_default())
    }

    async fn step(&self, session: Session, event: Event) -> Step {
        if event.is_command("cancel") {
            return self.cancelled();
        }
        if event.is_command("start") || event == Event::Button(Action::MainMenu) {
            return Step::advance(Session::SelectingAction, self.main_menu());
        }

        match session {
            Session::SelectingAction => self.on_selecting(event),
            Session::HelpMenu => match event {
                Event::Button(Action::HelpTopic(topic)) => {
                    Step::advance(Session::HelpMenu, views::help_topic(topic))
                }
                event => self.on_selecting(event),
            },
            Session::AddTitle => on_add_title(event),
            Session::AddDescription { title } => match event {
                Event::Text(text) => {
                    let description = text.trim().to_owned();
                    Step::advance(
                        Session::AddCover { title, description },
                        Reply::text(
                            "🖼 Now send a cover image, or /skip to continue without one.",
                        ),
                    )
                }
                _ => Step::reprompt(
                    Session::AddDescription { title },
                    Reply::text("📝 Please send the description as text."),
                ),
            },
            Session::AddCover { title, description } => {
                let cover = match cover_input(&event) {
                    Some(cover) => cover,
                    None => {
                        return Step::reprompt(
                            Session::AddCover { title, description },
                            Reply::text("🖼 Please send an image for the cover, or /skip."),
                        );
                    }
                };
                self.commit_new_work(title, description, cover).await
            }
            Session::SelectWork { slugs } => {
                if let Event::Button(Action::Select(index)) = event
                    && let Some(slug) = slugs.get(index)
                {
                    return self.open_work(slug.clone());
                }
                let works = self.store.list();
                if works.is_empty() {
                    return Step::advance(Session::SelectingAction, self.main_menu());
                }
                let (next, reply) = work_picker(&works);
                Step::reprompt(next, reply)
            }
            Session::ActionMenu { slug } => self.on_action_menu(slug, event),
            Session::EditMenu { slug } => {
                let Some(work) = self.store.get(&slug) else {
                    return self.not_found(&slug);
                };
                match event {
                    Event::Button(Action::EditTitle) => Step::advance(
                        Session::EditTitle { slug },
                        Reply::text(format!(
                            "✏️ Current title: \"{}\"\n\nSend the new title. The link slug stays the same.",
                            work.title
                        )),
                    ),
                    Event::Button(Action::EditDescription) => Step::advance(
                        Session::EditDescription { slug },
                        Reply::text("📝 Send the new description."),
                    ),
                    Event::Button(Action::EditCover) => Step::advance(
                        Session::EditCover { slug },
                        Reply::text("🖼 Send the new cover image, or /skip to remove the cover."),
                    ),
                    Event::Button(Action::OpenWork) => self.open_work(slug),
                    _ => {
                        let reply = views::edit_menu(&work);
                        Step::reprompt(Session::EditMenu { slug }, reply)
                    }
                }
            }
            Session::EditTitle { slug } => match event {
                Event::Text(text) if !text.trim().is_empty() => {
                    let title = text.trim().to_owned();
                    let confirmation = format!("✅ Title changed to \"{title}\".");
                    self.commit_edit(&slug, confirmation, move |work| work.title = title)
                        .await
                }
                _ => Step::reprompt(
                    Session::EditTitle { slug },
                    Reply::text("✏️ Please send the new title as text."),
                ),
            },
            Session::EditDescription { slug } => match event {
                Event::Text(text) => {
                    let description = text.trim().to_owned();
                    self.commit_edit(&slug, "✅ Description updated.".to_owned(), move |work| {
                        work.description = description
                    })
                    .await
                }
                _ => Step::reprompt(
                    Session::EditDescription { slug },
                    Reply::text("📝 Please send the new description as text."),
                ),
            },
            Session::EditCover { slug } => match cover_input(&event) {
                Some(cover) => {
                    let confirmation = if cover.is_some() {
                        "✅ Cover updated."
                    } else {
                        "✅ Cover removed."
                    };
                    self.commit_edit(&slug, confirmation.to_owned(), move |work| {
                        work.cover_reference = cover
                    })
                    .await
                }
                None => Step::reprompt(
                    Session::EditCover { slug },
                    Reply::text("🖼 Please send an image, or /skip to remove the cover."),
                ),
            },
            Session::AddChapterMethod { slug } => {
                let Some(work) = self.store.get(&slug) else {
                    return self.not_found(&slug);
                };
                match event {
                    Event::Button(Action::ChapterArchive) => Step::advance(
                        Session::AddChapterArchive { slug },
                        views::archive_instructions(),
                    ),
                    Event::Button(Action::ChapterManual) => Step::advance(
                        Session::AddChapterManualNumber { slug },
                        Reply::text("🔢 Send the chapter number (for example 1, 2 or 2.5)."),
                    ),
                    Event::Button(Action::OpenWork) => self.open_work(slug),
                    _ => {
                        let reply = views::chapter_method(&work);
                        Step::reprompt(Session::AddChapterMethod { slug }, reply)
                    }
                }
            }
            Session::AddChapterArchive { slug } => match event {
                Event::Document {
                    reference,
                    file_name,
                    mime_type,
                } => {
                    if event::is_zip_document(file_name.as_deref(), mime_type.as_deref()) {
                        self.ingest_archive(slug, &reference).await
                    } else {
                        Step::reprompt(
                            Session::AddChapterArchive { slug },
                            Reply::text(
                                "❌ Invalid file type. Please send a ZIP file (.zip extension).",
                            ),
                        )
                    }
                }
                _ => Step::reprompt(
                    Session::AddChapterArchive { slug },
                    Reply::text("❌ Please send a ZIP file containing your chapters, or /cancel."),
                ),
            },
            Session::AddChapterManualNumber { slug } => match event {
                Event::Text(text) if !text.trim().is_empty() => {
                    let chapter = text.trim().to_owned();
                    let reply = Reply::text(format!(
                        "🖼 Send the pages of chapter {chapter} in order, as photos or image files. Send /done when finished."
                    ));
                    Step::advance(
                        Session::AddChapterManualPages {
                            slug,
                            chapter,
                            pages: Vec::new(),
                        },
                        reply,
                    )
                }
                _ => Step::reprompt(
                    Session::AddChapterManualNumber { slug },
                    Reply::text("🔢 Please send the chapter number as text."),
                ),
            },
            Session::AddChapterManualPages {
                slug,
                chapter,
                mut pages,
            } => {
                if let Some(reference) = event.image_reference() {
                    pages.push(reference.to_owned());
                    let reply = Reply::text(format!(
                        "✅ Page {} added. Send more, or /done to finish.",
                        pages.len()
                    ));
                    return Step::advance(
                        Session::AddChapterManualPages {
                            slug,
                            chapter,
                            pages,
                        },
                        reply,
                    );
                }
                let done = event.is_command("done")
                    || matches!(&event, Event::Text(text) if text.trim().eq_ignore_ascii_case("done"));
                if !done {
                    let reply = Reply::text("🖼 Please send an image, or /done to finish.");
                    return Step::reprompt(
                        Session::AddChapterManualPages {
                            slug,
                            chapter,
                            pages,
                        },
                        reply,
                    );
                }
                if pages.is_empty() {
                    return Step::reprompt(
                        Session::AddChapterManualPages {
                            slug,
                            chapter,
                            pages,
                        },
                        Reply::text("❌ No pages yet. Send at least one image before /done."),
                    );
                }
                self.commit_manual_chapter(slug, chapter, pages).await
            }
            Session::SelectChapterDelete { slug, keys } => match event {
                Event::Button(Action::RemoveChapter(index)) => match keys.get(index) {
                    Some(key) => self.commit_chapter_removal(slug, key.clone()).await,
                    None => self.chapter_picker(slug, Outcome::Reprompted, Vec::new()),
                },
                Event::Button(Action::OpenWork) => self.open_work(slug),
                _ => self.chapter_picker(slug, Outcome::Reprompted, Vec::new()),
            },
            Session::DeleteConfirm { slug, title } => match event {
                Event::Button(Action::ConfirmDelete) => self.commit_delete(&slug, &title).await,
                Event::Button(Action::OpenWork) => self.open_work(slug),
                _ => {
                    let Some(work) = self.store.get(&slug) else {
                        return self.not_found(&slug);
                    };
                    let reply = views::delete_confirm(&title, &work);
                    Step::reprompt(Session::DeleteConfirm { slug, title }, reply)
                }
            },
        }
    }

    fn on_selecting(&self, event: Event) -> Step {
        match event {
            Event::Button(Action::AddWork) => Step::advance(Session::AddTitle, prompt_title()),
            Event::Button(Action::ManageWorks) => self.manage_works(),
            Event::Button(Action::Help) => Step::advance(Session::HelpMenu, views::help()),
            Event::Command { name, .. } if name == "help" => {
                Step::advance(Session::HelpMenu, views::help())
            }
            Event::Button(Action::Stats) => {
                Step::advance(Session::SelectingAction, views::stats(&self.store.stats()))
            }
            Event::Command { name, .. } if name == "stats" => {
                Step::advance(Session::SelectingAction, views::stats(&self.store.stats()))
            }
            Event::Command { name, .. } if name == "listcomics" => Step {
                next: Session::SelectingAction,
                replies: views::work_listing(&self.store.list()),
                outcome: Outcome::Advanced,
            },
            Event::Command { name, args } if name == "addcomic" => self.shortcut_add_work(&args),
            Event::Command { name, args } if name == "addchapter" => {
                self.shortcut_existing(&name, &args, |slug, work| {
                    let reply = views::chapter_method(work);
                    Step::advance(Session::AddChapterMethod { slug }, reply)
                })
            }
            Event::Command { name, args } if name == "deletecomic" => {
                self.shortcut_existing(&name, &args, |slug, work| {
                    let title = work.title.clone();
                    let reply = views::delete_confirm(&title, work);
                    Step::advance(Session::DeleteConfirm { slug, title }, reply)
                })
            }
            Event::Command { .. } => Step::reprompt(
                Session::SelectingAction,
                Reply::text("❓ Unknown command here. Use /help to see what is available, or /cancel."),
            ),
            _ => Step::reprompt(Session::SelectingAction, self.main_menu()),
        }
    }

    fn on_action_menu(&self, slug: String, event: Event) -> Step {
        let Some(work) = self.store.get(&slug) else {
            return self.not_found(&slug);
        };
        match event {
            Event::Button(Action::AddChapters) => {
                let reply = views::chapter_method(&work);
                Step::advance(Session::AddChapterMethod { slug }, reply)
            }
            Event::Button(Action::EditInfo) => {
                let reply = views::edit_menu(&work);
                Step::advance(Session::EditMenu { slug }, reply)
            }
            Event::Button(Action::DeleteWork) => {
                let title = work.title.clone();
                let reply = views::delete_confirm(&title, &work);
                Step::advance(Session::DeleteConfirm { slug, title }, reply)
            }
            Event::Button(Action::DeleteChapterMenu) => {
                if work.chapters.is_empty() {
                    let reply = Reply::text(format!("📭 \"{}\" has no chapters yet.", work.title));
                    let menu = views::work_menu(&slug, &work);
                    return Step {
                        next: Session::ActionMenu { slug },
                        replies: vec![reply, menu],
                        outcome: Outcome::Reprompted,
                    };
                }
                self.chapter_picker(slug, Outcome::Advanced, Vec::new())
            }
            Event::Button(Action::ManageWorks) => self.manage_works(),
            _ => {
                let reply = views::work_menu(&slug, &work);
                Step::reprompt(Session::ActionMenu { slug }, reply)
            }
        }
    }

    fn main_menu(&self) -> Reply {
        views::main_menu(&self.store.stats())
    }

    fn manage_works(&self) -> Step {
        let works = self.store.list();
        if works.is_empty() {
            return Step::reprompt(
                Session::SelectingAction,
                views::back_to_menu("📭 No comics yet. Add one first."),
            );
        }
        let (next, reply) = work_picker(&works);
        Step::advance(next, reply)
    }

    /// Chapter deletion picker over the work's current chapter keys. `notices`
    /// are sent ahead of the list.
    fn chapter_picker(&self, slug: String, outcome: Outcome, mut notices: Vec<Reply>) -> Step {
        let Some(work) = self.store.get(&slug) else {
            return self.not_found(&slug);
        };
        let keys = work.chapter_keys();
        notices.push(views::chapter_delete_list(&work, &keys));
        Step {
            next: Session::SelectChapterDelete { slug, keys },
            replies: notices,
            outcome,
        }
    }

    fn open_work(&self, slug: String) -> Step {
        match self.store.get(&slug) {
            Some(work) => {
                let reply = views::work_menu(&slug, &work);
                Step::advance(Session::ActionMenu { slug }, reply)
            }
            None => self.not_found(&slug),
        }
    }

    fn not_found(&self, slug: &str) -> Step {
        tracing::info!(slug, "work no longer exists; clearing session");
        Step::new(
            Session::SelectingAction,
            Outcome::NotFound,
            views::back_to_menu("❌ That comic no longer exists."),
        )
    }

    fn cancelled(&self) -> Step {
        Step {
            next: Session::SelectingAction,
            replies: vec![Reply::text("🚫 Operation cancelled."), self.main_menu()],
            outcome: Outcome::Cancelled,
        }
    }

    fn shortcut_add_work(&self, args: &str) -> Step {
        let Some(title) = quoted_title(args) else {
            return rejected("Usage: /addcomic \"Comic Title\"".to_owned());
        };
        if let Some(slug) = self.store.find_by_title(&title) {
            return rejected(format!(
                "❌ A comic titled \"{title}\" already exists ({slug})."
            ));
        }
        if catalog::slugify(&title).is_empty() {
            return rejected("❌ The title must contain at least one letter or digit.".to_owned());
        }
        Step::advance(
            Session::AddDescription { title: title.clone() },
            Reply::text(format!(
                "📚 Adding \"{title}\"\n\n📝 Send a short description."
            )),
        )
    }

    fn shortcut_existing<F>(&self, command: &str, args: &str, start: F) -> Step
    where
        F: FnOnce(String, &Work) -> Step,
    {
        let Some(title) = quoted_title(args) else {
            return rejected(format!("Usage: /{command} \"Comic Title\""));
        };
        let found = self
            .store
            .find_by_title(&title)
            .and_then(|slug| self.store.get(&slug).map(|work| (slug, work)));
        match found {
            Some((slug, work)) => start(slug, &work),
            None => Step::new(
                Session::SelectingAction,
                Outcome::NotFound,
                Reply::text(format!("❌ No comic titled \"{title}\". See /listcomics.")),
            ),
        }
    }

    /// Flushes after a committed mutation and appends a notice to `replies`
    /// when the write did not reach the sink.
    async fn persist(&self, replies: &mut Vec<Reply>) {
        if let Err(err) = self.store.flush().await {
            tracing::error!(%err, "flush after commit failed");
            replies.push(Reply::text(format!(
                "⚠️ The change is kept in memory but could not be saved to the channel ({err}). It will be written with the next change."
            )));
        }
    }

    async fn committed(&self, confirmation: String) -> Step {
        let mut replies = vec![Reply::text(confirmation)];
        self.persist(&mut replies).await;
        replies.push(self.main_menu());
        Step {
            next: Session::SelectingAction,
            replies,
            outcome: Outcome::Committed,
        }
    }

    async fn commit_new_work(&self, title: String, description: String, cover: Option<String>) -> Step {
        let slug = catalog::slugify(&title);
        let confirmation = format!("✅ Comic \"{title}\" added.\n🔗 Slug: {slug}");
        if let Some(replaced) = self.store.upsert(&slug, Work::new(title.clone(), description, cover)) {
            tracing::warn!(slug = %slug, previous = %replaced.title, "slug collision replaced an existing work");
        }
        tracing::info!(slug = %slug, title = %title, "work added");
        self.committed(confirmation).await
    }

    async fn commit_edit<F>(&self, slug: &str, confirmation: String, edit: F) -> Step
    where
        F: FnOnce(&mut Work),
    {
        match self.store.update_work(slug, edit) {
            Ok(()) => {
                tracing::info!(slug, "work updated");
                self.committed(confirmation).await
            }
            Err(_) => self.not_found(slug),
        }
    }

    async fn commit_manual_chapter(&self, slug: String, chapter: String, pages: Vec<String>) -> Step {
        let count = pages.len();
        match self.store.put_chapter(&slug, &chapter, pages) {
            Ok(previous) => {
                if previous.is_some() {
                    tracing::info!(slug = %slug, chapter = %chapter, "chapter replaced");
                }
                tracing::info!(slug = %slug, chapter = %chapter, pages = count, "chapter added");
                self.committed(format!("✅ Chapter {chapter} saved with {count} pages."))
                    .await
            }
            Err(_) => self.not_found(&slug),
        }
    }

    async fn commit_chapter_removal(&self, slug: String, chapter: String) -> Step {
        match self.store.remove_chapter(&slug, &chapter) {
            Ok(pages) => {
                tracing::info!(slug = %slug, chapter = %chapter, pages = pages.len(), "chapter deleted");
                self.committed(format!("🗑 Chapter {chapter} deleted.")).await
            }
            Err(StoreError::ChapterNotFound { .. }) => self.chapter_picker(
                slug,
                Outcome::Reprompted,
                vec![Reply::text(format!("❌ Chapter {chapter} is already gone."))],
            ),
            Err(StoreError::WorkNotFound { .. }) => self.not_found(&slug),
        }
    }

    async fn commit_delete(&self, slug: &str, title: &str) -> Step {
        match self.store.delete(slug) {
            Some(work) => {
                tracing::info!(slug, chapters = work.chapters.len(), "work deleted");
                self.committed(format!("🗑 Comic \"{title}\" deleted.")).await
            }
            None => self.not_found(slug),
        }
    }

    async fn ingest_archive(&self, slug: String, reference: &str) -> Step {
        let Some(work) = self.store.get(&slug) else {
            return self.not_found(&slug);
        };
        let archive = match self.objects.download(reference).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(slug = %slug, ?err, "failed to download archive");
                return Step::new(
                    Session::AddChapterArchive { slug },
                    Outcome::Failed,
                    Reply::text("❌ Could not download the file. Please send it again."),
                );
            }
        };
        let report = match self.pipeline.ingest(archive, &slug).await {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(slug = %slug, %err, "archive ingestion failed");
                return Step::new(
                    Session::AddChapterArchive { slug },
                    Outcome::Failed,
                    Reply::text(format!(
                        "❌ Could not read the archive ({err}). Please send a valid ZIP file."
                    )),
                );
            }
        };
        if report.is_empty() {
            return Step::new(
                Session::AddChapterArchive { slug },
                Outcome::Failed,
                Reply::text(
                    "❌ No chapters found. Put each chapter's images in its own folder inside the ZIP and send it again.",
                ),
            );
        }

        let summary = views::ingest_summary(&work.title, &report);
        match self.store.merge_chapters(&slug, report.chapters) {
            Ok(()) => self.committed(summary).await,
            Err(_) => self.not_found(&slug),
        }
    }
}

fn on_add_title(event: Event) -> Step {
    let Event::Text(text) = event else {
        return Step::reprompt(
            Session::AddTitle,
            Reply::text("📚 Please send the title as text."),
        );
    };
    let title = text.trim();
    if title.is_empty() {
        return Step::reprompt(Session::AddTitle, Reply::text("❌ The title cannot be empty."));
    }
    if catalog::slugify(title).is_empty() {
        return Step::reprompt(
            Session::AddTitle,
            Reply::text("❌ The title must contain at least one letter or digit."),
        );
    }
    Step::advance(
        Session::AddDescription {
            title: title.to_owned(),
        },
        Reply::text(format!("📚 \"{title}\"\n\n📝 Now send a short description.")),
    )
}

fn work_picker(works: &[(String, Work)]) -> (Session, Reply) {
    let slugs = works.iter().map(|(slug, _)| slug.clone()).collect();
    (Session::SelectWork { slugs }, views::work_list(works))
}

fn prompt_title() -> Reply {
    Reply::text("📚 Add New Comic\n\nSend me the title of the new comic.")
}

fn rejected(text: String) -> Step {
    Step::new(Session::SelectingAction, Outcome::Rejected, Reply::text(text))
}

/// `Some(Some(reference))` for an image, `Some(None)` for `/skip`,
/// `None` for anything else.
fn cover_input(event: &Event) -> Option<Option<String>> {
    if event.is_command("skip") {
        return Some(None);
    }
    event.image_reference().map(|reference| Some(reference.to_owned()))
}

fn quoted_title(args: &str) -> Option<String> {
    let caps = QUOTED_TITLE.captures(args.trim())?;
    let title = caps.get(1)?.as_str().trim();
    (!title.is_empty()).then(|| title.to_owned())
}
