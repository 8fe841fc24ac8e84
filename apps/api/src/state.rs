use std::sync::Arc;

use confab_broker::{Publisher, TaskQueues};
use confab_bus::Bus;
use confab_chat::ChatEngine;
use confab_external::{DocxRenderer, Llm};
use confab_store::{ObjectStore, Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub objects: ObjectStore,
    pub queues: Arc<tokio::sync::Mutex<TaskQueues>>,
    pub publisher: Publisher,
    pub bus: Bus,
    pub llm: Arc<dyn Llm>,
    pub docx: Arc<dyn DocxRenderer>,
    pub chat: Arc<ChatEngine>,
    pub chat_history_limit: usize,
}
