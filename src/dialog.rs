//! Password dialog interface.
//!
//! The lock manager talks to the user only through [`DialogController`].
//! Every dialog it opens is wrapped in a [`DialogGuard`], which releases the
//! dialog on every exit path and wipes the dialog's password buffer as soon
//! as it has been copied out.

use std::collections::VecDeque;

use zeroize::{Zeroize, Zeroizing};

/// A password prompt.
pub trait DialogController {
    /// Prepares a dialog titled with the lock's source label.
    fn create_dialog(&mut self, title: &str, needs_confirmation: bool);

    /// Shows the dialog; `false` means the user cancelled.
    fn show_dialog(&mut self) -> bool;

    /// Buffer holding the password just entered.
    ///
    /// Callers copy it out and zero it immediately.
    fn password(&mut self) -> &mut [u8];

    /// Tells the user the last password was rejected.
    fn report_bad_password(&mut self);

    /// Frees the dialog.
    fn release_dialog(&mut self);
}

/// RAII guard for an open dialog.
/// Dropping it releases the dialog.
pub struct DialogGuard<'a, D: DialogController + ?Sized> {
    dialog: &'a mut D,
}

impl<'a, D: DialogController + ?Sized> DialogGuard<'a, D> {
    /// Creates the dialog.
    pub fn open(dialog: &'a mut D, title: &str, needs_confirmation: bool) -> Self {
        dialog.create_dialog(title, needs_confirmation);
        Self { dialog }
    }

    /// Shows the dialog; `false` on cancellation.
    pub fn show(&mut self) -> bool {
        self.dialog.show_dialog()
    }

    /// Copies the entered password out and zeroes the dialog's buffer.
    pub fn take_password(&mut self) -> Zeroizing<Vec<u8>> {
        let buffer = self.dialog.password();
        let password = Zeroizing::new(buffer.to_vec());
        buffer.zeroize();
        password
    }

    pub fn report_bad_password(&mut self) {
        self.dialog.report_bad_password();
    }
}

impl<'a, D: DialogController + ?Sized> Drop for DialogGuard<'a, D> {
    fn drop(&mut self) {
        self.dialog.release_dialog();
    }
}

/// Non-interactive dialog replaying a queue of passwords.
///
/// Suited to batch jobs and tests: each `show_dialog` consumes the next queued
/// password and an empty queue reads as cancellation.
pub struct ScriptedDialog {
    queue: VecDeque<Zeroizing<Vec<u8>>>,
    current: Zeroizing<Vec<u8>>,
    open: bool,
    created: usize,
    shown: usize,
    bad_reports: usize,
    released: usize,
    last_title: Option<String>,
    last_confirmation: bool,
}

impl Default for ScriptedDialog {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            current: Zeroizing::new(Vec::new()),
            open: false,
            created: 0,
            shown: 0,
            bad_reports: 0,
            released: 0,
            last_title: None,
            last_confirmation: false,
        }
    }
}

impl ScriptedDialog {
    /// Creates a dialog that will answer with `passwords`, in order.
    pub fn new<I, P>(passwords: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let mut dialog = Self::default();
        for p in passwords {
            dialog.push(p.as_ref());
        }
        dialog
    }

    /// Queues another answer.
    pub fn push(&mut self, password: &[u8]) {
        self.queue.push_back(Zeroizing::new(password.to_vec()));
    }

    /// Answers not yet consumed.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Dialogs created so far.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Times the dialog was shown (answered or cancelled).
    pub fn shown(&self) -> usize {
        self.shown
    }

    /// Rejections reported to the user.
    pub fn bad_reports(&self) -> usize {
        self.bad_reports
    }

    /// Dialogs released so far.
    pub fn released(&self) -> usize {
        self.released
    }

    /// Whether a dialog is currently open.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Title of the most recently created dialog.
    pub fn last_title(&self) -> Option<&str> {
        self.last_title.as_deref()
    }

    /// Whether the most recent dialog asked for confirmation.
    pub fn last_confirmation(&self) -> bool {
        self.last_confirmation
    }
}

impl DialogController for ScriptedDialog {
    fn create_dialog(&mut self, title: &str, needs_confirmation: bool) {
        self.open = true;
        self.created += 1;
        self.last_title = Some(title.to_owned());
        self.last_confirmation = needs_confirmation;
    }

    fn show_dialog(&mut self) -> bool {
        self.shown += 1;
        match self.queue.pop_front() {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    fn password(&mut self) -> &mut [u8] {
        &mut self.current
    }

    fn report_bad_password(&mut self) {
        self.bad_reports += 1;
        log::warn!("Password rejected ({} so far)", self.bad_reports);
    }

    fn release_dialog(&mut self) {
        self.open = false;
        self.released += 1;
        self.current.zeroize();
    }
}
