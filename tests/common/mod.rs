//! Shared fixtures for the integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use warden::prelude::*;

/// Route log output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Log output collected by [`CapturedLogs::capture`]
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Run `f` with warnings and errors of the current thread recorded
    pub fn capture<R>(f: impl FnOnce() -> R) -> (R, CapturedLogs) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        (result, logs)
    }

    /// Everything recorded so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Manager over an empty in-memory document, plus the document itself
pub fn memory_manager() -> anyhow::Result<(AuthorizationManager, Arc<MemoryConfigurationSource>)> {
    init_tracing();
    let source = Arc::new(MemoryConfigurationSource::new());
    let manager = AuthorizationManager::builder()
        .with_shared_source(source.clone())
        .build()?;
    Ok((manager, source))
}

/// Manager over an in-memory document with a small seeded model:
///
/// - privileges `read` and `write` (`create,read`)
/// - roles `viewer` (read), `editor` (write, contains viewer) and a read-only
///   `admin` containing editor
/// - user `jdoe` holding `editor`
pub fn seeded_manager() -> anyhow::Result<(AuthorizationManager, Arc<MemoryConfigurationSource>)> {
    let (manager, source) = memory_manager()?;

    manager.create_privilege(Privilege::method("read", "Read", "read"))?;
    manager.create_privilege(Privilege::method("write", "Write", "create"))?;
    manager.create_role(Role::new(RoleKey::local("viewer"), "Viewer").with_privilege("read"))?;
    manager.create_role(
        Role::new(RoleKey::local("editor"), "Editor")
            .with_privilege("write")
            .with_role(RoleKey::local("viewer")),
    )?;
    manager.create_role(
        Role::new(RoleKey::local("admin"), "Admin")
            .read_only()
            .with_role(RoleKey::local("editor")),
    )?;
    manager.create_user(
        User::local("jdoe").with_email("jdoe@example.com"),
        [RoleKey::local("editor")],
    )?;

    Ok((manager, source))
}
