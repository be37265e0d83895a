use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Admin, Book, Member};

/// Typed values produced by a validated book form, ready for persistence.
pub(crate) struct BookInput {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) published_date: NaiveDate,
    pub(crate) quantity: i64,
}

/// Internal representation of the book form fields. Values stay raw strings
/// until `parse_inputs` turns them into typed data, so the user can type
/// freely and only sees validation errors on save.
#[derive(Default, Clone)]
pub(crate) struct BookForm {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) author: String,
    pub(crate) published: String,
    pub(crate) quantity: String,
    pub(crate) active: BookField,
    /// Editing flows key the update by the existing id, so the id field is
    /// shown but excluded from focus.
    pub(crate) id_locked: bool,
    pub(crate) error: Option<String>,
}

/// Fields available within the book form.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub(crate) enum BookField {
    #[default]
    Id,
    Title,
    Author,
    Published,
    Quantity,
}

impl BookForm {
    /// Populate the form from an existing book when entering edit mode.
    pub(crate) fn from_book(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            published: book.published_date.format("%Y-%m-%d").to_string(),
            quantity: book.quantity.to_string(),
            active: BookField::Title,
            id_locked: true,
            error: None,
        }
    }

    /// Cycle focus forward across the editable fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            BookField::Id => BookField::Title,
            BookField::Title => BookField::Author,
            BookField::Author => BookField::Published,
            BookField::Published => BookField::Quantity,
            BookField::Quantity => {
                if self.id_locked {
                    BookField::Title
                } else {
                    BookField::Id
                }
            }
        };
    }

    /// Cycle focus backward across the editable fields.
    pub(crate) fn toggle_field_back(&mut self) {
        self.active = match self.active {
            BookField::Id => BookField::Quantity,
            BookField::Title => {
                if self.id_locked {
                    BookField::Quantity
                } else {
                    BookField::Id
                }
            }
            BookField::Author => BookField::Title,
            BookField::Published => BookField::Author,
            BookField::Quantity => BookField::Published,
        };
    }

    /// Append a character to the active field, filtering obviously invalid
    /// input while typing.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            BookField::Id => {
                self.id.push(ch);
                true
            }
            BookField::Title => {
                self.title.push(ch);
                true
            }
            BookField::Author => {
                self.author.push(ch);
                true
            }
            BookField::Published => {
                if ch.is_ascii_digit() || ch == '-' {
                    self.published.push(ch);
                    true
                } else {
                    false
                }
            }
            BookField::Quantity => {
                if ch.is_ascii_digit() {
                    self.quantity.push(ch);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            BookField::Id => {
                self.id.pop();
            }
            BookField::Title => {
                self.title.pop();
            }
            BookField::Author => {
                self.author.pop();
            }
            BookField::Published => {
                self.published.pop();
            }
            BookField::Quantity => {
                self.quantity.pop();
            }
        }
    }

    /// Validate the raw inputs and return typed values ready for persistence.
    pub(crate) fn parse_inputs(&self) -> Result<BookInput> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(anyhow!("Book ID is required."));
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Title is required."));
        }
        let published_date = NaiveDate::parse_from_str(self.published.trim(), "%Y-%m-%d")
            .context("Published date must be YYYY-MM-DD.")?;
        let quantity = self
            .quantity
            .trim()
            .parse::<i64>()
            .context("Quantity must be a whole number.")?;
        if quantity < 0 {
            return Err(anyhow!("Quantity cannot be negative."));
        }

        Ok(BookInput {
            id: id.to_string(),
            title: title.to_string(),
            author: self.author.trim().to_string(),
            published_date,
            quantity,
        })
    }

    /// Render a single styled line for the form modal.
    pub(crate) fn build_line(&self, field_name: &str, field: BookField) -> Line<'static> {
        let value = self.value_of(field);
        let is_active = self.active == field;

        let display = if field == BookField::Id && self.id_locked {
            format!("{value} (fixed)")
        } else if value.is_empty() {
            placeholder_for(field).to_string()
        } else {
            value.to_string()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() || (field == BookField::Id && self.id_locked) {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::raw(format!("{field_name}: ")),
            Span::styled(display, style),
        ])
    }

    fn value_of(&self, field: BookField) -> &str {
        match field {
            BookField::Id => &self.id,
            BookField::Title => &self.title,
            BookField::Author => &self.author,
            BookField::Published => &self.published,
            BookField::Quantity => &self.quantity,
        }
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: BookField) -> usize {
        self.value_of(field).chars().count()
    }
}

fn placeholder_for(field: BookField) -> &'static str {
    match field {
        BookField::Id | BookField::Title => "<required>",
        BookField::Author => "<optional>",
        BookField::Published => "<YYYY-MM-DD>",
        BookField::Quantity => "<required>",
    }
}

/// Form state shared by the admin account flows (id, username, password).
#[derive(Default, Clone)]
pub(crate) struct AccountForm {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) active: AccountField,
    pub(crate) id_locked: bool,
    pub(crate) error: Option<String>,
}

/// Fields available within the account form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum AccountField {
    #[default]
    Id,
    Username,
    Password,
}

impl AccountForm {
    /// Populate the form from an existing admin when entering edit mode.
    pub(crate) fn from_admin(admin: &Admin) -> Self {
        Self {
            id: admin.id.clone(),
            username: admin.username.clone(),
            password: admin.password.clone(),
            active: AccountField::Username,
            id_locked: true,
            error: None,
        }
    }

    /// Cycle focus across the editable fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            AccountField::Id => AccountField::Username,
            AccountField::Username => AccountField::Password,
            AccountField::Password => {
                if self.id_locked {
                    AccountField::Username
                } else {
                    AccountField::Id
                }
            }
        };
    }

    /// Append a character to the active field.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            AccountField::Id => self.id.push(ch),
            AccountField::Username => self.username.push(ch),
            AccountField::Password => self.password.push(ch),
        }
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            AccountField::Id => {
                self.id.pop();
            }
            AccountField::Username => {
                self.username.pop();
            }
            AccountField::Password => {
                self.password.pop();
            }
        }
    }

    /// Validate the inputs and return trimmed values ready for persistence.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, String)> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(anyhow!("ID is required."));
        }
        let username = self.username.trim();
        if username.is_empty() {
            return Err(anyhow!("Username is required."));
        }
        let password = self.password.trim();
        if password.is_empty() {
            return Err(anyhow!("Password is required."));
        }
        Ok((id.to_string(), username.to_string(), password.to_string()))
    }

    /// Render a single styled line for the form modal.
    pub(crate) fn build_line(&self, field_name: &str, field: AccountField) -> Line<'static> {
        let value = self.value_of(field);
        build_account_like_line(
            field_name,
            value,
            self.active == field,
            field == AccountField::Id && self.id_locked,
        )
    }

    fn value_of(&self, field: AccountField) -> &str {
        match field {
            AccountField::Id => &self.id,
            AccountField::Username => &self.username,
            AccountField::Password => &self.password,
        }
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: AccountField) -> usize {
        self.value_of(field).chars().count()
    }
}

/// Form state for member registration and editing.
#[derive(Default, Clone)]
pub(crate) struct MemberForm {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) membership_number: String,
    pub(crate) password: String,
    pub(crate) active: MemberField,
    pub(crate) id_locked: bool,
    pub(crate) error: Option<String>,
}

/// Fields available within the member form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum MemberField {
    #[default]
    Id,
    Name,
    MembershipNumber,
    Password,
}

impl MemberForm {
    /// Populate the form from an existing member when entering edit mode.
    pub(crate) fn from_member(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
            membership_number: member.membership_number.clone(),
            password: member.password.clone(),
            active: MemberField::Name,
            id_locked: true,
            error: None,
        }
    }

    /// Cycle focus across the editable fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            MemberField::Id => MemberField::Name,
            MemberField::Name => MemberField::MembershipNumber,
            MemberField::MembershipNumber => MemberField::Password,
            MemberField::Password => {
                if self.id_locked {
                    MemberField::Name
                } else {
                    MemberField::Id
                }
            }
        };
    }

    /// Append a character to the active field.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            MemberField::Id => self.id.push(ch),
            MemberField::Name => self.name.push(ch),
            MemberField::MembershipNumber => self.membership_number.push(ch),
            MemberField::Password => self.password.push(ch),
        }
        true
    }

    /// Remove the last character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            MemberField::Id => {
                self.id.pop();
            }
            MemberField::Name => {
                self.name.pop();
            }
            MemberField::MembershipNumber => {
                self.membership_number.pop();
            }
            MemberField::Password => {
                self.password.pop();
            }
        }
    }

    /// Validate the inputs and return trimmed values ready for persistence.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, String, String)> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err(anyhow!("Member ID is required."));
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Name is required."));
        }
        let membership_number = self.membership_number.trim();
        if membership_number.is_empty() {
            return Err(anyhow!("Membership number is required."));
        }
        let password = self.password.trim();
        if password.is_empty() {
            return Err(anyhow!("Password is required."));
        }
        Ok((
            id.to_string(),
            name.to_string(),
            membership_number.to_string(),
            password.to_string(),
        ))
    }

    /// Render a single styled line for the form modal.
    pub(crate) fn build_line(&self, field_name: &str, field: MemberField) -> Line<'static> {
        let value = self.value_of(field);
        build_account_like_line(
            field_name,
            value,
            self.active == field,
            field == MemberField::Id && self.id_locked,
        )
    }

    fn value_of(&self, field: MemberField) -> &str {
        match field {
            MemberField::Id => &self.id,
            MemberField::Name => &self.name,
            MemberField::MembershipNumber => &self.membership_number,
            MemberField::Password => &self.password,
        }
    }

    /// Return the character count for the requested field.
    pub(crate) fn value_len(&self, field: MemberField) -> usize {
        self.value_of(field).chars().count()
    }
}

/// Shared line rendering for the plain-text account-style forms.
fn build_account_like_line(
    field_name: &str,
    value: &str,
    is_active: bool,
    locked: bool,
) -> Line<'static> {
    let display = if locked {
        format!("{value} (fixed)")
    } else if value.is_empty() {
        "<required>".to_string()
    } else {
        value.to_string()
    };

    let style = if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() || locked {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::raw(format!("{field_name}: ")),
        Span::styled(display, style),
    ])
}

/// Which collection a pending delete confirmation targets.
#[derive(Copy, Clone)]
pub(crate) enum ConfirmTarget {
    Book,
    Admin,
    Member,
}

/// State for the delete confirmation dialog. `label` is the human-readable
/// summary shown in the prompt.
#[derive(Clone)]
pub(crate) struct ConfirmDelete {
    pub(crate) target: ConfirmTarget,
    pub(crate) id: String,
    pub(crate) label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_book_form() -> BookForm {
        BookForm {
            id: "B1".to_string(),
            title: "Golang Basics".to_string(),
            author: "X".to_string(),
            published: "2020-05-01".to_string(),
            quantity: "2".to_string(),
            ..BookForm::default()
        }
    }

    #[test]
    fn book_form_parses_valid_input() {
        let input = filled_book_form().parse_inputs().unwrap();
        assert_eq!(input.id, "B1");
        assert_eq!(input.quantity, 2);
        assert_eq!(
            input.published_date,
            NaiveDate::from_ymd_opt(2020, 5, 1).unwrap()
        );
    }

    #[test]
    fn book_form_rejects_bad_date_and_quantity() {
        let mut form = filled_book_form();
        form.published = "05/01/2020".to_string();
        assert!(form.parse_inputs().is_err());

        let mut form = filled_book_form();
        form.quantity = "two".to_string();
        assert!(form.parse_inputs().is_err());

        let mut form = filled_book_form();
        form.title = "  ".to_string();
        assert!(form.parse_inputs().is_err());
    }

    #[test]
    fn quantity_field_only_accepts_digits() {
        let mut form = BookForm {
            active: BookField::Quantity,
            ..BookForm::default()
        };
        assert!(form.push_char('3'));
        assert!(!form.push_char('x'));
        assert!(!form.push_char('-'));
        assert_eq!(form.quantity, "3");
    }

    #[test]
    fn edit_mode_skips_the_locked_id_field() {
        let mut form = filled_book_form();
        form.id_locked = true;
        form.active = BookField::Quantity;
        form.toggle_field();
        assert_eq!(form.active, BookField::Title);
    }

    #[test]
    fn account_form_requires_every_field() {
        let mut form = AccountForm {
            id: "A1".to_string(),
            username: "root".to_string(),
            password: String::new(),
            ..AccountForm::default()
        };
        assert!(form.parse_inputs().is_err());
        form.password = "pw".to_string();
        assert!(form.parse_inputs().is_ok());
    }

    #[test]
    fn member_form_round_trips_trimmed_values() {
        let form = MemberForm {
            id: " M1 ".to_string(),
            name: "Ada".to_string(),
            membership_number: "0042".to_string(),
            password: "pw".to_string(),
            ..MemberForm::default()
        };
        let (id, name, number, password) = form.parse_inputs().unwrap();
        assert_eq!(id, "M1");
        assert_eq!(name, "Ada");
        assert_eq!(number, "0042");
        assert_eq!(password, "pw");
    }
}
