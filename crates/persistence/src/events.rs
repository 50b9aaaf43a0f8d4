use crate::document::SaveDocument;
use crate::error::SaveErrorKind;
use crate::slot::SlotId;

/// What asked for a save. Autosave triggers are filtered through the config
/// toggles; `Manual` never is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveTrigger {
    Manual,
    Timer,
    Checkpoint,
    SceneTransition,
    ApplicationQuit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    SaveCompleted {
        slot: SlotId,
        trigger: SaveTrigger,
        incremental: bool,
    },
    SaveFailed {
        slot: SlotId,
        trigger: SaveTrigger,
        kind: SaveErrorKind,
        message: String,
    },
    LoadCompleted {
        slot: SlotId,
        recovered_from_backup: Option<u32>,
        migrated_from: Option<u32>,
    },
    LoadFailed {
        slot: SlotId,
        kind: SaveErrorKind,
        message: String,
    },
}

type Listener = Box<dyn FnMut(&SaveEvent)>;
type PreSaveHook = Box<dyn FnMut(SlotId, &mut SaveDocument)>;
type PostLoadHook = Box<dyn FnMut(SlotId, &SaveDocument)>;

/// Callbacks run in the order they were added.
#[derive(Default)]
pub(crate) struct HookLists {
    listeners: Vec<Listener>,
    pre_save: Vec<PreSaveHook>,
    post_load: Vec<PostLoadHook>,
}

impl HookLists {
    pub(crate) fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub(crate) fn add_pre_save(&mut self, hook: PreSaveHook) {
        self.pre_save.push(hook);
    }

    pub(crate) fn add_post_load(&mut self, hook: PostLoadHook) {
        self.post_load.push(hook);
    }

    pub(crate) fn emit(&mut self, event: &SaveEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub(crate) fn run_pre_save(&mut self, slot: SlotId, document: &mut SaveDocument) {
        for hook in &mut self.pre_save {
            hook(slot, document);
        }
    }

    pub(crate) fn run_post_load(&mut self, slot: SlotId, document: &SaveDocument) {
        for hook in &mut self.post_load {
            hook(slot, document);
        }
    }
}
