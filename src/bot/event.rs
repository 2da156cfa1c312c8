use crate::ingest;

/// Chat user id of whoever sent the event.
pub type ActorId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `/name args`; `name` is lower-cased and stripped of any `@bot` suffix.
    Command {
        name: String,
        args: String,
    },
    Text(String),
    Photo {
        reference: String,
    },
    Document {
        reference: String,
        file_name: Option<String>,
        mime_type: Option<String>,
    },
    Button(Action),
    /// Anything else the chat can deliver (stickers, stale buttons, ...).
    Unsupported,
}

impl Event {
    /// Classifies a text message as a command or free text.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::Text(text.to_owned());
        };
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();
        if name.is_empty() {
            return Self::Text(text.to_owned());
        }
        Self::Command {
            name,
            args: args.to_owned(),
        }
    }

    pub fn command(name: &str) -> Self {
        Self::Command {
            name: name.to_owned(),
            args: String::new(),
        }
    }

    pub fn is_command(&self, wanted: &str) -> bool {
        matches!(self, Self::Command { name, .. } if name == wanted)
    }

    /// Reference of an image carried by this event, either a photo or an
    /// image document.
    pub fn image_reference(&self) -> Option<&str> {
        match self {
            Self::Photo { reference } => Some(reference.as_str()),
            Self::Document {
                reference,
                file_name,
                mime_type,
            } => {
                let by_mime = mime_type
                    .as_deref()
                    .is_some_and(|mime| mime.starts_with("image/"));
                let by_name = file_name.as_deref().is_some_and(ingest::is_image);
                (by_mime || by_name).then_some(reference.as_str())
            }
            _ => None,
        }
    }
}

pub fn is_zip_document(file_name: Option<&str>, mime_type: Option<&str>) -> bool {
    let by_name = file_name.is_some_and(|name| name.to_ascii_lowercase().ends_with(".zip"));
    let by_mime = mime_type
        .is_some_and(|mime| matches!(mime, "application/zip" | "application/x-zip-compressed"));
    by_name || by_mime
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Archive,
    Commands,
}

/// Telegram rejects a whole message when any button's callback data exceeds this.
pub const MAX_CALLBACK_BYTES: usize = 64;

/// Inline-button actions. Encoded as Telegram callback data.
///
/// List picks carry a position in the list the session was shown, never a
/// slug or chapter key, so the encoded form stays short for any title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    MainMenu,
    AddWork,
    ManageWorks,
    Help,
    HelpTopic(HelpTopic),
    Stats,
    Select(usize),
    /// Back to the menu of the work the session is on.
    OpenWork,
    AddChapters,
    EditInfo,
    EditTitle,
    EditDescription,
    EditCover,
    DeleteChapterMenu,
    RemoveChapter(usize),
    DeleteWork,
    ConfirmDelete,
    ChapterArchive,
    ChapterManual,
}

impl Action {
    pub fn encode(&self) -> String {
        match self {
            Self::MainMenu => "main_menu".to_owned(),
            Self::AddWork => "add_work".to_owned(),
            Self::ManageWorks => "manage_works".to_owned(),
            Self::Help => "help".to_owned(),
            Self::HelpTopic(HelpTopic::Archive) => "help_archive".to_owned(),
            Self::HelpTopic(HelpTopic::Commands) => "help_commands".to_owned(),
            Self::Stats => "stats".to_owned(),
            Self::Select(index) => format!("select:{index}"),
            Self::OpenWork => "open_work".to_owned(),
            Self::AddChapters => "add_chapters".to_owned(),
            Self::EditInfo => "edit_info".to_owned(),
            Self::EditTitle => "edit_title".to_owned(),
            Self::EditDescription => "edit_description".to_owned(),
            Self::EditCover => "edit_cover".to_owned(),
            Self::DeleteChapterMenu => "delete_chapter".to_owned(),
            Self::RemoveChapter(index) => format!("remove_chapter:{index}"),
            Self::DeleteWork => "delete_work".to_owned(),
            Self::ConfirmDelete => "confirm_delete".to_owned(),
            Self::ChapterArchive => "chapter_archive".to_owned(),
            Self::ChapterManual => "chapter_manual".to_owned(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        if let Some(index) = data.strip_prefix("select:") {
            return index.parse().ok().map(Self::Select);
        }
        if let Some(index) = data.strip_prefix("remove_chapter:") {
            return index.parse().ok().map(Self::RemoveChapter);
        }
        let action = match data {
            "main_menu" => Self::MainMenu,
            "add_work" => Self::AddWork,
            "manage_works" => Self::ManageWorks,
            "help" => Self::Help,
            "help_archive" => Self::HelpTopic(HelpTopic::Archive),
            "help_commands" => Self::HelpTopic(HelpTopic::Commands),
            "stats" => Self::Stats,
            "open_work" => Self::OpenWork,
            "add_chapters" => Self::AddChapters,
            "edit_info" => Self::EditInfo,
            "edit_title" => Self::EditTitle,
            "edit_description" => Self::EditDescription,
            "edit_cover" => Self::EditCover,
            "delete_chapter" => Self::DeleteChapterMenu,
            "delete_work" => Self::DeleteWork,
            "confirm_delete" => Self::ConfirmDelete,
            "chapter_archive" => Self::ChapterArchive,
            "chapter_manual" => Self::ChapterManual,
            _ => return None,
        };
        Some(action)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// One outbound message, optionally with an inline keyboard (rows of buttons).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
        }
    }

    pub fn button(mut self, label: impl Into<String>, action: Action) -> Self {
        self.keyboard.push(vec![Button::new(label, action)]);
        self
    }
}
