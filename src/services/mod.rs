pub(crate) mod companion;
pub(crate) mod conversation;
pub(crate) mod documents;
pub(crate) mod exam_session;
pub(crate) mod llm;
pub(crate) mod mentor;
pub(crate) mod progress;
pub(crate) mod question_bank;
pub(crate) mod scoring;
pub(crate) mod sessions;
pub(crate) mod speech;
pub(crate) mod storage;
