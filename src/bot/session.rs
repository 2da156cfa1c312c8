/// Per-actor conversation state. Each variant carries exactly the fields its
/// state needs; returning to `SelectingAction` clears everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    SelectingAction,
    HelpMenu,
    AddTitle,
    AddDescription {
        title: String,
    },
    AddCover {
        title: String,
        description: String,
    },
    /// `slugs` is the list the picker showed, in button order.
    SelectWork {
        slugs: Vec<String>,
    },
    ActionMenu {
        slug: String,
    },
    EditMenu {
        slug: String,
    },
    EditTitle {
        slug: String,
    },
    EditDescription {
        slug: String,
    },
    EditCover {
        slug: String,
    },
    AddChapterMethod {
        slug: String,
    },
    AddChapterArchive {
        slug: String,
    },
    AddChapterManualNumber {
        slug: String,
    },
    AddChapterManualPages {
        slug: String,
        chapter: String,
        pages: Vec<String>,
    },
    SelectChapterDelete {
        slug: String,
        keys: Vec<String>,
    },
    DeleteConfirm {
        slug: String,
        title: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    SelectingAction,
    HelpMenu,
    AddTitle,
    AddDescription,
    AddCover,
    SelectWork,
    ActionMenu,
    EditMenu,
    EditTitle,
    EditDescription,
    EditCover,
    AddChapterMethod,
    AddChapterArchive,
    AddChapterManualNumber,
    AddChapterManualPages,
    SelectChapterDelete,
    DeleteConfirm,
}

impl Session {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::SelectingAction => StateKind::SelectingAction,
            Self::HelpMenu => StateKind::HelpMenu,
            Self::AddTitle => StateKind::AddTitle,
            Self::AddDescription { .. } => StateKind::AddDescription,
            Self::AddCover { .. } => StateKind::AddCover,
            Self::SelectWork { .. } => StateKind::SelectWork,
            Self::ActionMenu { .. } => StateKind::ActionMenu,
            Self::EditMenu { .. } => StateKind::EditMenu,
            Self::EditTitle { .. } => StateKind::EditTitle,
            Self::EditDescription { .. } => StateKind::EditDescription,
            Self::EditCover { .. } => StateKind::EditCover,
            Self::AddChapterMethod { .. } => StateKind::AddChapterMethod,
            Self::AddChapterArchive { .. } => StateKind::AddChapterArchive,
            Self::AddChapterManualNumber { .. } => StateKind::AddChapterManualNumber,
            Self::AddChapterManualPages { .. } => StateKind::AddChapterManualPages,
            Self::SelectChapterDelete { .. } => StateKind::SelectChapterDelete,
            Self::DeleteConfirm { .. } => StateKind::DeleteConfirm,
        }
    }
}
