pub mod user;
pub mod workspace;
pub mod team;
pub mod worker;
pub mod project;
pub mod sprint;
pub mod tag;
pub mod bug;
pub mod bug_tag;
pub mod bug_dependency;
pub mod bug_attachment;
pub mod time_tracking;
pub mod activity_log;
pub mod notification;
