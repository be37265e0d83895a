use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{
    borrow_book, delete_admin, delete_book, delete_member, insert_admin, insert_book,
    insert_member, return_book, update_admin, update_book, update_member,
};
use crate::models::{Admin, Book, Member};

use super::forms::{
    AccountField, AccountForm, BookField, BookForm, ConfirmDelete, ConfirmTarget, MemberField,
    MemberForm,
};
use super::helpers::{centered_rect, surface_error};
use super::screens::{AdminScreen, BookScreen, CirculationScreen, MemberScreen};

/// Footer space reserved for status messages and key legends.
const FOOTER_HEIGHT: u16 = 3;

/// Labels for the screen tabs in cycling order.
const SCREEN_TITLES: [&str; 4] = ["Books", "Admins", "Members", "Circulation"];

/// High-level navigation states, one per desk workflow. Keeping this explicit
/// makes it easy to reason about which rendering path runs and what the
/// keyboard should do.
enum Screen {
    Books(BookScreen),
    Admins(AdminScreen),
    Members(MemberScreen),
    Circulation(CirculationScreen),
}

/// Fine-grained modes scoped to the current screen. Forms and confirmation
/// dialogs carry their state here so `Normal` key handling stays simple.
enum Mode {
    Normal,
    AddingBook(BookForm),
    EditingBook { id: String, form: BookForm },
    AddingAdmin(AccountForm),
    EditingAdmin { id: String, form: AccountForm },
    AddingMember(MemberForm),
    EditingMember { id: String, form: MemberForm },
    ConfirmDelete(ConfirmDelete),
    Searching(SearchState),
}

/// State for an active title search on the catalog screen.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. Owns the single store
/// connection for the whole process; every screen borrows it per operation.
pub struct App {
    conn: Connection,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Hydrate the catalog screen and start in normal mode.
    pub fn new(conn: Connection) -> Result<Self> {
        let books = BookScreen::load(&conn)?;
        Ok(Self {
            conn,
            screen: Screen::Books(books),
            mode: Mode::Normal,
            status: None,
        })
    }

    /// Dispatch one key press. Returns `true` when the application should
    /// exit.
    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::AddingBook(form) => self.handle_add_book(code, form)?,
            Mode::EditingBook { id, form } => self.handle_edit_book(code, id, form)?,
            Mode::AddingAdmin(form) => self.handle_add_admin(code, form)?,
            Mode::EditingAdmin { id, form } => self.handle_edit_admin(code, id, form)?,
            Mode::AddingMember(form) => self.handle_add_member(code, form)?,
            Mode::EditingMember { id, form } => self.handle_edit_member(code, id, form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::Searching(state) => self.handle_search(code, state)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Ctrl+R processes a book return while the circulation screen is open.
    pub fn handle_ctrl_r(&mut self) -> Result<()> {
        if !matches!(self.mode, Mode::Normal) {
            return Ok(());
        }
        let target = match &self.screen {
            Screen::Circulation(circulation) => circulation.target_id().map(str::to_string),
            _ => return Ok(()),
        };

        match target {
            Some(id) => {
                if return_book(&self.conn, &id)? {
                    self.set_status(format!("Returned one copy of '{id}'."), StatusKind::Info);
                } else {
                    self.set_status(
                        format!("Unable to return '{id}': unknown book id."),
                        StatusKind::Error,
                    );
                }
            }
            None => self.set_status("Enter a book id first.", StatusKind::Error),
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Tab => {
                self.cycle_screen(1)?;
                return Ok(Mode::Normal);
            }
            KeyCode::BackTab => {
                self.cycle_screen(-1)?;
                return Ok(Mode::Normal);
            }
            _ => {}
        }

        match self.screen {
            Screen::Books(ref mut books) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;

                match code {
                    KeyCode::Char('q') => *exit = true,
                    KeyCode::Esc => {
                        if books.search_pattern().is_some() {
                            books.set_search(&self.conn, "")?;
                            status_to_set =
                                Some(("Search cleared.".to_string(), StatusKind::Info));
                        } else {
                            *exit = true;
                        }
                    }
                    KeyCode::Up => books.move_selection(-1),
                    KeyCode::Down => books.move_selection(1),
                    KeyCode::PageUp => books.move_selection(-5),
                    KeyCode::PageDown => books.move_selection(5),
                    KeyCode::Home => books.select_first(),
                    KeyCode::End => books.select_last(),
                    KeyCode::Left => {
                        if books.search_pattern().is_some() {
                            status_to_set = Some((
                                "Pagination is disabled while searching.".to_string(),
                                StatusKind::Error,
                            ));
                        } else {
                            books.previous_page(&self.conn)?;
                        }
                    }
                    KeyCode::Right => {
                        if books.search_pattern().is_some() {
                            status_to_set = Some((
                                "Pagination is disabled while searching.".to_string(),
                                StatusKind::Error,
                            ));
                        } else {
                            books.next_page(&self.conn)?;
                        }
                    }
                    KeyCode::Char('f') => {
                        let query = books.search_pattern().unwrap_or("").to_string();
                        return Ok(Mode::Searching(SearchState { query }));
                    }
                    KeyCode::Char('+') => {
                        return Ok(Mode::AddingBook(BookForm::default()));
                    }
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        if let Some(book) = books.current_book().cloned() {
                            return Ok(Mode::EditingBook {
                                id: book.id.clone(),
                                form: BookForm::from_book(&book),
                            });
                        }
                        status_to_set =
                            Some(("No book selected to edit.".to_string(), StatusKind::Error));
                    }
                    KeyCode::Char('-') => {
                        if let Some(book) = books.current_book().cloned() {
                            return Ok(Mode::ConfirmDelete(ConfirmDelete {
                                target: ConfirmTarget::Book,
                                id: book.id.clone(),
                                label: book.display_title(),
                            }));
                        }
                        status_to_set =
                            Some(("No book selected to delete.".to_string(), StatusKind::Error));
                    }
                    _ => {}
                }

                if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }
                Ok(Mode::Normal)
            }
            Screen::Admins(ref mut admins) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut back_to_books = false;

                match code {
                    KeyCode::Char('q') => *exit = true,
                    KeyCode::Esc => back_to_books = true,
                    KeyCode::Up => admins.move_selection(-1),
                    KeyCode::Down => admins.move_selection(1),
                    KeyCode::Char('+') => {
                        return Ok(Mode::AddingAdmin(AccountForm::default()));
                    }
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        if let Some(admin) = admins.current_admin().cloned() {
                            return Ok(Mode::EditingAdmin {
                                id: admin.id.clone(),
                                form: AccountForm::from_admin(&admin),
                            });
                        }
                        status_to_set =
                            Some(("No admin selected to edit.".to_string(), StatusKind::Error));
                    }
                    KeyCode::Char('-') => {
                        if let Some(admin) = admins.current_admin().cloned() {
                            return Ok(Mode::ConfirmDelete(ConfirmDelete {
                                target: ConfirmTarget::Admin,
                                id: admin.id.clone(),
                                label: admin.username.clone(),
                            }));
                        }
                        status_to_set = Some((
                            "No admin selected to delete.".to_string(),
                            StatusKind::Error,
                        ));
                    }
                    _ => {}
                }

                if back_to_books {
                    self.open_screen(0)?;
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }
                Ok(Mode::Normal)
            }
            Screen::Members(ref mut members) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut back_to_books = false;

                match code {
                    KeyCode::Char('q') => *exit = true,
                    KeyCode::Esc => back_to_books = true,
                    KeyCode::Up => members.move_selection(-1),
                    KeyCode::Down => members.move_selection(1),
                    KeyCode::Char('b') | KeyCode::Char('B') => {
                        let shown = members.toggle_available_books(&self.conn)?;
                        let text = if shown {
                            "Showing every book on the shelf."
                        } else {
                            "Hid the book listing."
                        };
                        status_to_set = Some((text.to_string(), StatusKind::Info));
                    }
                    KeyCode::Char('+') => {
                        return Ok(Mode::AddingMember(MemberForm::default()));
                    }
                    KeyCode::Char('e') | KeyCode::Char('E') => {
                        if let Some(member) = members.current_member().cloned() {
                            return Ok(Mode::EditingMember {
                                id: member.id.clone(),
                                form: MemberForm::from_member(&member),
                            });
                        }
                        status_to_set =
                            Some(("No member selected to edit.".to_string(), StatusKind::Error));
                    }
                    KeyCode::Char('-') => {
                        if let Some(member) = members.current_member().cloned() {
                            return Ok(Mode::ConfirmDelete(ConfirmDelete {
                                target: ConfirmTarget::Member,
                                id: member.id.clone(),
                                label: member.name.clone(),
                            }));
                        }
                        status_to_set = Some((
                            "No member selected to delete.".to_string(),
                            StatusKind::Error,
                        ));
                    }
                    _ => {}
                }

                if back_to_books {
                    self.open_screen(0)?;
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }
                Ok(Mode::Normal)
            }
            Screen::Circulation(ref mut circulation) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut back_to_books = false;

                match code {
                    KeyCode::Esc => {
                        if circulation.target_id().is_some() {
                            circulation.clear();
                        } else {
                            back_to_books = true;
                        }
                    }
                    KeyCode::Backspace => circulation.backspace(),
                    KeyCode::Enter => {
                        if let Some(id) = circulation.target_id().map(str::to_string) {
                            if borrow_book(&self.conn, &id)? {
                                status_to_set = Some((
                                    format!("Borrowed one copy of '{id}'."),
                                    StatusKind::Info,
                                ));
                            } else {
                                status_to_set = Some((
                                    format!(
                                        "Unable to borrow '{id}': out of stock or unknown id."
                                    ),
                                    StatusKind::Error,
                                ));
                            }
                        } else {
                            status_to_set =
                                Some(("Enter a book id first.".to_string(), StatusKind::Error));
                        }
                    }
                    KeyCode::Char(ch) => {
                        circulation.push_char(ch);
                    }
                    _ => {}
                }

                if back_to_books {
                    self.open_screen(0)?;
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }
                Ok(Mode::Normal)
            }
        }
    }

    fn handle_add_book(&mut self, code: KeyCode, mut form: BookForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab => form.toggle_field(),
            KeyCode::BackTab => form.toggle_field_back(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok(input) => {
                    let book = Book {
                        id: input.id,
                        title: input.title,
                        author: input.author,
                        published_date: input.published_date,
                        quantity: input.quantity,
                    };
                    if let Err(err) = insert_book(&self.conn, &book) {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    } else {
                        self.refresh_current_screen()?;
                        self.set_status("Book added.", StatusKind::Info);
                        keep_open = false;
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingBook(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_edit_book(&mut self, code: KeyCode, id: String, mut form: BookForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab => form.toggle_field(),
            KeyCode::BackTab => form.toggle_field_back(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok(input) => {
                    if let Err(err) = update_book(
                        &self.conn,
                        &id,
                        &input.title,
                        &input.author,
                        input.published_date,
                        input.quantity,
                    ) {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    } else {
                        self.refresh_current_screen()?;
                        self.set_status("Book updated.", StatusKind::Info);
                        keep_open = false;
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingBook { id, form })
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_add_admin(&mut self, code: KeyCode, mut form: AccountForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Add cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((id, username, password)) => {
                    let admin = Admin {
                        id,
                        username,
                        password,
                    };
                    if let Err(err) = insert_admin(&self.conn, &admin) {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    } else {
                        self.refresh_current_screen()?;
                        self.set_status("Admin added.", StatusKind::Info);
                        keep_open = false;
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingAdmin(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_edit_admin(
        &mut self,
        code: KeyCode,
        id: String,
        mut form: AccountForm,
    ) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((_, username, password)) => {
                    if let Err(err) = update_admin(&self.conn, &id, &username, &password) {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    } else {
                        self.refresh_current_screen()?;
                        self.set_status("Admin updated.", StatusKind::Info);
                        keep_open = false;
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingAdmin { id, form })
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_add_member(&mut self, code: KeyCode, mut form: MemberForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Registration cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((id, name, membership_number, password)) => {
                    let member = Member {
                        id,
                        name,
                        membership_number,
                        password,
                    };
                    if let Err(err) = insert_member(&self.conn, &member) {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    } else {
                        self.refresh_current_screen()?;
                        self.set_status("Member registered.", StatusKind::Info);
                        keep_open = false;
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::AddingMember(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_edit_member(
        &mut self,
        code: KeyCode,
        id: String,
        mut form: MemberForm,
    ) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Edit cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match form.parse_inputs() {
                Ok((_, name, membership_number, password)) => {
                    if let Err(err) =
                        update_member(&self.conn, &id, &name, &membership_number, &password)
                    {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                    } else {
                        self.refresh_current_screen()?;
                        self.set_status("Member updated.", StatusKind::Info);
                        keep_open = false;
                    }
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingMember { id, form })
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                let result = match confirm.target {
                    ConfirmTarget::Book => delete_book(&self.conn, &confirm.id),
                    ConfirmTarget::Admin => delete_admin(&self.conn, &confirm.id),
                    ConfirmTarget::Member => delete_member(&self.conn, &confirm.id),
                };
                match result {
                    Ok(()) => {
                        self.refresh_current_screen()?;
                        self.set_status(
                            format!("Deleted '{}'.", confirm.label),
                            StatusKind::Info,
                        );
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        let books = match &mut self.screen {
            Screen::Books(books) => books,
            _ => return Ok(Mode::Normal),
        };

        match code {
            KeyCode::Esc => {
                books.set_search(&self.conn, "")?;
                self.set_status("Search cleared.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => {
                return Ok(Mode::Normal);
            }
            KeyCode::Up => {
                books.move_selection(-1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Down => {
                books.move_selection(1);
                return Ok(Mode::Searching(state));
            }
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) => {
                if !ch.is_control() {
                    state.query.push(ch);
                }
            }
            _ => return Ok(Mode::Searching(state)),
        }

        // Live re-query on every edit; an emptied query drops straight back
        // to paginated mode at page 0.
        books.set_search(&self.conn, &state.query)?;
        Ok(Mode::Searching(state))
    }

    fn screen_index(&self) -> usize {
        match self.screen {
            Screen::Books(_) => 0,
            Screen::Admins(_) => 1,
            Screen::Members(_) => 2,
            Screen::Circulation(_) => 3,
        }
    }

    fn cycle_screen(&mut self, direction: isize) -> Result<()> {
        let count = SCREEN_TITLES.len() as isize;
        let next = (self.screen_index() as isize + direction).rem_euclid(count) as usize;
        self.open_screen(next)
    }

    /// Switch to the screen at `index`, hydrating it fresh from the store so
    /// every visit reflects the latest records.
    fn open_screen(&mut self, index: usize) -> Result<()> {
        self.clear_status();
        self.screen = match index {
            0 => Screen::Books(BookScreen::load(&self.conn)?),
            1 => Screen::Admins(AdminScreen::load(&self.conn)?),
            2 => Screen::Members(MemberScreen::load(&self.conn)?),
            _ => Screen::Circulation(CirculationScreen::default()),
        };
        Ok(())
    }

    /// Re-fetch the current screen's records after a mutation.
    fn refresh_current_screen(&mut self) -> Result<()> {
        match &mut self.screen {
            Screen::Books(books) => books.refresh(&self.conn),
            Screen::Admins(admins) => admins.refresh(&self.conn),
            Screen::Members(members) => members.refresh(&self.conn),
            Screen::Circulation(_) => Ok(()),
        }
    }

    fn set_status(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    pub fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(FOOTER_HEIGHT),
            ])
            .split(frame.area());

        self.draw_tabs(frame, chunks[0]);

        match &self.screen {
            Screen::Books(books) => self.draw_books(frame, chunks[1], books),
            Screen::Admins(admins) => self.draw_admins(frame, chunks[1], admins),
            Screen::Members(members) => self.draw_members(frame, chunks[1], members),
            Screen::Circulation(circulation) => {
                self.draw_circulation(frame, chunks[1], circulation)
            }
        }

        self.draw_footer(frame, chunks[2]);

        match &self.mode {
            Mode::Normal | Mode::Searching(_) => {}
            Mode::AddingBook(form) => self.draw_book_form(frame, chunks[1], "Add Book", form),
            Mode::EditingBook { form, .. } => {
                self.draw_book_form(frame, chunks[1], "Edit Book", form)
            }
            Mode::AddingAdmin(form) => {
                self.draw_account_form(frame, chunks[1], "Add Admin", form)
            }
            Mode::EditingAdmin { form, .. } => {
                self.draw_account_form(frame, chunks[1], "Edit Admin", form)
            }
            Mode::AddingMember(form) => {
                self.draw_member_form(frame, chunks[1], "Register Member", form)
            }
            Mode::EditingMember { form, .. } => {
                self.draw_member_form(frame, chunks[1], "Edit Member", form)
            }
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, chunks[1], confirm),
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let current = self.screen_index();
        let mut spans = vec![Span::raw(" ")];
        for (idx, title) in SCREEN_TITLES.iter().enumerate() {
            if idx > 0 {
                spans.push(Span::raw("  |  "));
            }
            let style = if idx == current {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(*title, style));
        }

        let block = Block::default()
            .title("Library Desk Manager")
            .borders(Borders::ALL);
        let paragraph = Paragraph::new(Line::from(spans)).block(block);
        frame.render_widget(paragraph, area);
    }

    fn draw_books(&self, frame: &mut Frame, area: Rect, books: &BookScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);

        let block = Block::default().title("Catalog").borders(Borders::ALL);
        let inner = block.inner(chunks[0]);
        frame.render_widget(block, chunks[0]);

        if books.books.is_empty() {
            let empty_text = if books.search_pattern().is_some() {
                "No titles match the search pattern."
            } else {
                "No books on record yet. Press + to add one."
            };
            let paragraph = Paragraph::new(empty_text)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, inner);
        } else {
            let lines: Vec<Line<'_>> = books
                .books
                .iter()
                .enumerate()
                .skip(scroll_offset(books.selected, inner.height as usize))
                .take(inner.height as usize)
                .map(|(idx, book)| {
                    let marker = if idx == books.selected { "> " } else { "  " };
                    let text = format!(
                        "{marker}{:<10} {:<44} {}  x{}",
                        book.id,
                        book.display_title(),
                        book.published_date.format("%Y-%m-%d"),
                        book.quantity
                    );
                    if idx == books.selected {
                        Line::from(Span::styled(
                            text,
                            Style::default()
                                .fg(Color::Yellow)
                                .add_modifier(Modifier::BOLD),
                        ))
                    } else {
                        Line::from(text)
                    }
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), inner);
        }

        let info = self.books_info_line(books);
        frame.render_widget(Paragraph::new(info), chunks[1]);

        if let Mode::Searching(state) = &self.mode {
            let prefix = " Search title: ";
            let cursor_x = chunks[1].x + prefix.len() as u16 + state.query.chars().count() as u16;
            frame.set_cursor_position((cursor_x.min(chunks[1].right()), chunks[1].y));
        }
    }

    fn books_info_line(&self, books: &BookScreen) -> Line<'static> {
        if let Mode::Searching(state) = &self.mode {
            return Line::from(vec![
                Span::raw(" Search title: "),
                Span::styled(state.query.clone(), Style::default().fg(Color::Yellow)),
                Span::styled(
                    "   (Enter to keep, Esc to clear)",
                    Style::default().fg(Color::Gray),
                ),
            ]);
        }

        match books.search_pattern() {
            Some(pattern) => Line::from(format!(
                " Search results for '{pattern}': {} match(es)  |  {} copies on shelf",
                books.books.len(),
                books.total_quantity
            )),
            None => Line::from(format!(
                " Page {} of {}  |  {} titles  |  {} copies on shelf",
                books.page + 1,
                books.page_count(),
                books.total_books,
                books.total_quantity
            )),
        }
    }

    fn draw_admins(&self, frame: &mut Frame, area: Rect, admins: &AdminScreen) {
        let block = Block::default()
            .title("Admin Accounts")
            .borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if admins.admins.is_empty() {
            let paragraph = Paragraph::new("No admin accounts. Press + to add one.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, inner);
            return;
        }

        let lines: Vec<Line<'_>> = admins
            .admins
            .iter()
            .enumerate()
            .skip(scroll_offset(admins.selected, inner.height as usize))
            .take(inner.height as usize)
            .map(|(idx, admin)| {
                let marker = if idx == admins.selected { "> " } else { "  " };
                let text = format!("{marker}{:<10} {}", admin.id, admin.username);
                if idx == admins.selected {
                    Line::from(Span::styled(
                        text,
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(text)
                }
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_members(&self, frame: &mut Frame, area: Rect, members: &MemberScreen) {
        let (member_area, book_area) = if members.available_books.is_some() {
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(area);
            (halves[0], Some(halves[1]))
        } else {
            (area, None)
        };

        let block = Block::default().title("Members").borders(Borders::ALL);
        let inner = block.inner(member_area);
        frame.render_widget(block, member_area);

        if members.members.is_empty() {
            let paragraph = Paragraph::new("No members registered. Press + to register one.")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, inner);
        } else {
            let lines: Vec<Line<'_>> = members
                .members
                .iter()
                .enumerate()
                .skip(scroll_offset(members.selected, inner.height as usize))
                .take(inner.height as usize)
                .map(|(idx, member)| {
                    let marker = if idx == members.selected { "> " } else { "  " };
                    let text = format!(
                        "{marker}{:<10} {:<24} #{}",
                        member.id, member.name, member.membership_number
                    );
                    if idx == members.selected {
                        Line::from(Span::styled(
                            text,
                            Style::default()
                                .fg(Color::Yellow)
                                .add_modifier(Modifier::BOLD),
                        ))
                    } else {
                        Line::from(text)
                    }
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), inner);
        }

        if let (Some(book_area), Some(available)) = (book_area, &members.available_books) {
            let block = Block::default()
                .title("Available Books")
                .borders(Borders::ALL);
            let inner = block.inner(book_area);
            frame.render_widget(block, book_area);

            let lines: Vec<Line<'_>> = available
                .iter()
                .take(inner.height as usize)
                .map(|book| {
                    Line::from(format!(
                        "{:<10} {:<30} x{}",
                        book.id,
                        book.display_title(),
                        book.quantity
                    ))
                })
                .collect();
            frame.render_widget(Paragraph::new(lines), inner);
        }
    }

    fn draw_circulation(&self, frame: &mut Frame, area: Rect, circulation: &CirculationScreen) {
        let block = Block::default().title("Circulation").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let popup = centered_rect(60, 40, inner);
        let lines = vec![
            Line::from("Process a borrow or return by book id."),
            Line::from(""),
            Line::from(vec![
                Span::raw("Book ID: "),
                Span::styled(
                    circulation.book_id.clone(),
                    Style::default().fg(Color::Yellow),
                ),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to borrow - Ctrl+R to return - Esc to clear",
                Style::default().fg(Color::Gray),
            )),
        ];
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), popup);

        let prefix = "Book ID: ".len() as u16;
        let cursor_x = popup.x + prefix + circulation.book_id.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(popup.right()), popup.y + 2));
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let line = if let Some(status) = &self.status {
            Line::from(Span::styled(status.text.clone(), status.kind.style()))
        } else {
            self.legend_line()
        };

        frame.render_widget(Paragraph::new(line), inner);
    }

    fn legend_line(&self) -> Line<'static> {
        let key_style = Style::default().fg(Color::Yellow);
        match self.screen {
            Screen::Books(_) => Line::from(vec![
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[f]", key_style),
                Span::raw(" Search   "),
                Span::styled("[</>]", key_style),
                Span::raw(" Page   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Next screen   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            Screen::Admins(_) => Line::from(vec![
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Next screen   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            Screen::Members(_) => Line::from(vec![
                Span::styled("[+]", key_style),
                Span::raw(" Register   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[b]", key_style),
                Span::raw(" Books   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Next screen   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            Screen::Circulation(_) => Line::from(vec![
                Span::styled("[Enter]", key_style),
                Span::raw(" Borrow   "),
                Span::styled("[Ctrl+R]", key_style),
                Span::raw(" Return   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Clear   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Next screen"),
            ]),
        }
    }

    fn draw_book_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &BookForm) {
        let popup_area = centered_rect(70, 50, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Book ID", BookField::Id),
            form.build_line("Title", BookField::Title),
            form.build_line("Author", BookField::Author),
            form.build_line("Published", BookField::Published),
            form.build_line("Quantity", BookField::Quantity),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save - Tab to switch - Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let (prefix, row) = match form.active {
            BookField::Id => ("Book ID: ", 0),
            BookField::Title => ("Title: ", 1),
            BookField::Author => ("Author: ", 2),
            BookField::Published => ("Published: ", 3),
            BookField::Quantity => ("Quantity: ", 4),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right()), inner.y + row));
    }

    fn draw_account_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &AccountForm) {
        let popup_area = centered_rect(60, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("ID", AccountField::Id),
            form.build_line("Username", AccountField::Username),
            form.build_line("Password", AccountField::Password),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save - Tab to switch - Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let (prefix, row) = match form.active {
            AccountField::Id => ("ID: ", 0),
            AccountField::Username => ("Username: ", 1),
            AccountField::Password => ("Password: ", 2),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right()), inner.y + row));
    }

    fn draw_member_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &MemberForm) {
        let popup_area = centered_rect(60, 45, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Member ID", MemberField::Id),
            form.build_line("Name", MemberField::Name),
            form.build_line("Membership No.", MemberField::MembershipNumber),
            form.build_line("Password", MemberField::Password),
            Line::from(""),
        ];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save - Tab to switch - Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let (prefix, row) = match form.active {
            MemberField::Id => ("Member ID: ", 0),
            MemberField::Name => ("Name: ", 1),
            MemberField::MembershipNumber => ("Membership No.: ", 2),
            MemberField::Password => ("Password: ", 3),
        };
        let cursor_x = inner.x + prefix.len() as u16 + form.value_len(form.active) as u16;
        frame.set_cursor_position((cursor_x.min(inner.right()), inner.y + row));
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Deletion")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!("Delete '{}' (id {})?", confirm.label, confirm.id)),
            Line::from("The record is removed from the store permanently."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }
}

/// First visible row index so the selection stays on screen in tall lists.
fn scroll_offset(selected: usize, visible: usize) -> usize {
    if visible == 0 || selected < visible {
        0
    } else {
        selected + 1 - visible
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use crossterm::event::KeyCode;

    use crate::db::{fetch_all_books, insert_book, open_memory_store};
    use crate::models::Book;

    use super::*;

    fn seeded_app() -> App {
        let conn = open_memory_store();
        insert_book(
            &conn,
            &Book {
                id: "B1".to_string(),
                title: "Golang Basics".to_string(),
                author: "X".to_string(),
                published_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                quantity: 2,
            },
        )
        .unwrap();
        App::new(conn).unwrap()
    }

    fn type_str(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    #[test]
    fn tab_cycles_through_all_screens_and_wraps() {
        let mut app = seeded_app();
        assert_eq!(app.screen_index(), 0);
        for expected in [1, 2, 3, 0] {
            app.handle_key(KeyCode::Tab).unwrap();
            assert_eq!(app.screen_index(), expected);
        }
        app.handle_key(KeyCode::BackTab).unwrap();
        assert_eq!(app.screen_index(), 3);
    }

    #[test]
    fn circulation_borrow_decrements_through_the_store() {
        let mut app = seeded_app();
        // Books -> Admins -> Members -> Circulation.
        for _ in 0..3 {
            app.handle_key(KeyCode::Tab).unwrap();
        }
        type_str(&mut app, "B1");
        app.handle_key(KeyCode::Enter).unwrap();

        let quantity = fetch_all_books(&app.conn).unwrap()[0].quantity;
        assert_eq!(quantity, 1);

        app.handle_ctrl_r().unwrap();
        let quantity = fetch_all_books(&app.conn).unwrap()[0].quantity;
        assert_eq!(quantity, 2);
    }

    #[test]
    fn add_book_flow_persists_the_record() {
        let mut app = seeded_app();
        app.handle_key(KeyCode::Char('+')).unwrap();
        assert!(matches!(app.mode, Mode::AddingBook(_)));

        type_str(&mut app, "B2");
        app.handle_key(KeyCode::Tab).unwrap();
        type_str(&mut app, "Rust in Action");
        app.handle_key(KeyCode::Tab).unwrap();
        type_str(&mut app, "T. McNamara");
        app.handle_key(KeyCode::Tab).unwrap();
        type_str(&mut app, "2021-06-01");
        app.handle_key(KeyCode::Tab).unwrap();
        type_str(&mut app, "4");
        app.handle_key(KeyCode::Enter).unwrap();

        assert!(matches!(app.mode, Mode::Normal));
        let books = fetch_all_books(&app.conn).unwrap();
        assert_eq!(books.len(), 2);
        assert!(books.iter().any(|book| book.title == "Rust in Action"));
    }

    #[test]
    fn invalid_form_input_keeps_the_modal_open() {
        let mut app = seeded_app();
        app.handle_key(KeyCode::Char('+')).unwrap();
        // Only an id, no title or date.
        type_str(&mut app, "B9");
        app.handle_key(KeyCode::Enter).unwrap();

        match &app.mode {
            Mode::AddingBook(form) => assert!(form.error.is_some()),
            _ => panic!("form should stay open on validation failure"),
        }
        assert_eq!(fetch_all_books(&app.conn).unwrap().len(), 1);
    }

    #[test]
    fn search_mode_filters_and_esc_restores_pagination() {
        let mut app = seeded_app();
        app.handle_key(KeyCode::Char('f')).unwrap();
        type_str(&mut app, "go");

        match &app.screen {
            Screen::Books(books) => {
                assert_eq!(books.search_pattern(), Some("go"));
                assert_eq!(books.books.len(), 1);
            }
            _ => panic!("should still be on the books screen"),
        }

        app.handle_key(KeyCode::Esc).unwrap();
        match &app.screen {
            Screen::Books(books) => {
                assert_eq!(books.search_pattern(), None);
                assert_eq!(books.page, 0);
            }
            _ => panic!("should still be on the books screen"),
        }
    }

    #[test]
    fn delete_flow_requires_confirmation() {
        let mut app = seeded_app();
        app.handle_key(KeyCode::Char('-')).unwrap();
        assert!(matches!(app.mode, Mode::ConfirmDelete(_)));

        app.handle_key(KeyCode::Char('n')).unwrap();
        assert_eq!(fetch_all_books(&app.conn).unwrap().len(), 1);

        app.handle_key(KeyCode::Char('-')).unwrap();
        app.handle_key(KeyCode::Char('y')).unwrap();
        assert!(fetch_all_books(&app.conn).unwrap().is_empty());
    }
}
