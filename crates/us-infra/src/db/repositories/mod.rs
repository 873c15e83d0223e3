mod shortcut_repo;

pub use shortcut_repo::DieselShortcutRepository;
