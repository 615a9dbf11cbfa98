/// Line-oriented command shell
///
/// The shell is a thin collaborator over the core: it parses one line into a
/// [`Command`], calls the matching engine operation, and renders the result
/// as text. It keeps the selected filter and search text between commands and
/// remembers the numbering of the last task listing so tasks can be referred
/// to as `done 2` instead of by id.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_cli::{app::App, commands::{Outcome, Shell}, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let app = Arc::new(App::build(Config::from_env()?).await?);
/// let mut shell = Shell::new(app);
///
/// if let Outcome::Output(text) = shell.execute("login admin admin123").await? {
///     println!("{}", text);
/// }
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use taskdesk_shared::auth::service::AuthResult;
use taskdesk_shared::models::category::{Category, CategoryId};
use taskdesk_shared::models::task::{NewTask, Priority, Task, TaskId};
use taskdesk_shared::models::user::{NewUser, Role, User};
use taskdesk_shared::query::{TaskFeedControls, TaskStatistics};
use taskdesk_shared::store::TaskFilter;

use crate::app::App;
use crate::error::{ShellError, ShellResult};

pub const HELP: &str = "\
Commands:
  login <username|email> <password>   log in
  logout                              log out
  whoami                              show the current user
  tasks                               list tasks with the current filter and search
  filter <all|completed|pending|high> choose which tasks are listed
  search [text]                       search titles and descriptions (no text clears)
  add <title> [!low|!medium|!high] [@user] [#category] [due:YYYY-MM-DD]
                                      create a task
  done <n> / undo <n>                 mark task n (from the last listing) done or not done
  rm <n>                              delete task n
  show <n>                            show task n in detail
  stats                               task statistics
  users [text]                        list users, optionally filtered
  adduser <username> <email> <first> <last> <password> [admin]
                                      create a user (admin)
  deluser <username>                  delete a user (admin)
  passwd <current> <new>              change your password
  passwd --user <username> <new>      reset a user's password (admin)
  help                                this text
  quit                                leave the shell";

/// A parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { identifier: String, password: String },
    Logout,
    Whoami,
    Tasks,
    Filter(TaskFilter),
    Search(String),
    Add(TaskDraft),
    Done(String),
    Undo(String),
    Remove(String),
    Show(String),
    Stats,
    Users(String),
    AddUser { fields: NewUser, password: String },
    DeleteUser(String),
    Passwd { current: String, new: String },
    ResetPassword { username: String, new: String },
    Help,
    Quit,
}

/// Task fields as typed on the `add` line, before names are resolved
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
    pub category: Option<String>,
    pub due: Option<NaiveDate>,
}

impl Command {
    /// Parses one input line; `None` for a blank line
    pub fn parse(line: &str) -> ShellResult<Option<Command>> {
        let line = line.trim();
        let Some((verb, rest)) = split_verb(line) else {
            return Ok(None);
        };
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match verb.to_ascii_lowercase().as_str() {
            "login" => match args.as_slice() {
                [identifier, password] => Command::Login {
                    identifier: identifier.to_string(),
                    password: password.to_string(),
                },
                _ => return Err(ShellError::Usage("login <username|email> <password>")),
            },
            "logout" => Command::Logout,
            "whoami" => Command::Whoami,
            "tasks" | "ls" => Command::Tasks,
            "filter" => match args.as_slice() {
                [name] => Command::Filter(
                    TaskFilter::parse(name)
                        .ok_or(ShellError::Usage("filter <all|completed|pending|high>"))?,
                ),
                _ => return Err(ShellError::Usage("filter <all|completed|pending|high>")),
            },
            "search" => Command::Search(rest.trim().to_string()),
            "add" => Command::Add(parse_draft(&args)?),
            "done" => Command::Done(single(&args, "done <n>")?),
            "undo" => Command::Undo(single(&args, "undo <n>")?),
            "rm" => Command::Remove(single(&args, "rm <n>")?),
            "show" => Command::Show(single(&args, "show <n>")?),
            "stats" => Command::Stats,
            "users" => Command::Users(rest.trim().to_string()),
            "adduser" => parse_adduser(&args)?,
            "deluser" => Command::DeleteUser(single(&args, "deluser <username>")?),
            "passwd" => match args.as_slice() {
                ["--user", username, new] => Command::ResetPassword {
                    username: username.to_string(),
                    new: new.to_string(),
                },
                [current, new] => Command::Passwd {
                    current: current.to_string(),
                    new: new.to_string(),
                },
                _ => {
                    return Err(ShellError::Usage(
                        "passwd <current> <new> | passwd --user <username> <new>",
                    ))
                }
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ShellError::UnknownCommand(other.to_string())),
        };

        Ok(Some(command))
    }
}

fn split_verb(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest),
        None => (line, ""),
    })
}

fn single(args: &[&str], usage: &'static str) -> ShellResult<String> {
    match args {
        [value] => Ok(value.to_string()),
        _ => Err(ShellError::Usage(usage)),
    }
}

fn parse_draft(args: &[&str]) -> ShellResult<TaskDraft> {
    const USAGE: &str = "add <title> [!low|!medium|!high] [@user] [#category] [due:YYYY-MM-DD]";

    let mut draft = TaskDraft::default();
    let mut title = Vec::new();

    for arg in args {
        if let Some(level) = arg.strip_prefix('!') {
            draft.priority = Some(Priority::parse(level).ok_or(ShellError::Usage(USAGE))?);
        } else if let Some(user) = arg.strip_prefix('@') {
            draft.assignee = Some(user.to_string());
        } else if let Some(category) = arg.strip_prefix('#') {
            draft.category = Some(category.to_string());
        } else if let Some(date) = arg.strip_prefix("due:") {
            let due = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                ShellError::BadArgument(format!("'{}' is not a date (YYYY-MM-DD)", date))
            })?;
            draft.due = Some(due);
        } else {
            title.push(*arg);
        }
    }

    if title.is_empty() {
        return Err(ShellError::Usage(USAGE));
    }
    draft.title = title.join(" ");
    Ok(draft)
}

fn parse_adduser(args: &[&str]) -> ShellResult<Command> {
    const USAGE: &str = "adduser <username> <email> <first> <last> <password> [admin]";

    let (fields, password, role) = match args {
        [username, email, first, last, password] => {
            ([username, email, first, last], password, Role::Member)
        }
        [username, email, first, last, password, role] => {
            let role = Role::parse(role).ok_or(ShellError::Usage(USAGE))?;
            ([username, email, first, last], password, role)
        }
        _ => return Err(ShellError::Usage(USAGE)),
    };
    let [username, email, first, last] = fields;

    Ok(Command::AddUser {
        fields: NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role,
        },
        password: password.to_string(),
    })
}

/// Result of executing one line
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Text to show the user (may be empty)
    Output(String),

    /// The user asked to leave
    Quit,
}

/// Interactive shell state
pub struct Shell {
    app: Arc<App>,
    filter: TaskFilter,
    search: String,
    feed: Option<TaskFeedControls>,
    listing: Vec<TaskId>,
}

impl Shell {
    pub fn new(app: Arc<App>) -> Self {
        Shell {
            app,
            filter: TaskFilter::All,
            search: String::new(),
            feed: None,
            listing: Vec::new(),
        }
    }

    /// Mirrors filter and search changes onto a live task feed
    pub fn attach_feed(&mut self, controls: TaskFeedControls) {
        controls.set_filter(self.filter);
        controls.set_search(&self.search);
        self.feed = Some(controls);
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Parses and runs one line
    pub async fn execute(&mut self, line: &str) -> ShellResult<Outcome> {
        let Some(command) = Command::parse(line)? else {
            return Ok(Outcome::Output(String::new()));
        };
        if matches!(command, Command::Quit) {
            return Ok(Outcome::Quit);
        }
        self.run(command).await.map(Outcome::Output)
    }

    async fn run(&mut self, command: Command) -> ShellResult<String> {
        match command {
            Command::Login { identifier, password } => self.login(&identifier, &password).await,
            Command::Logout => {
                self.app.auth.logout().await?;
                self.listing.clear();
                Ok("Logged out".to_string())
            }
            Command::Whoami => Ok(match self.app.auth.state().user() {
                Some(user) => format!(
                    "{} ({}, {})",
                    user.username,
                    user.full_name(),
                    user.role
                ),
                None => "Not logged in".to_string(),
            }),
            Command::Tasks => self.tasks().await,
            Command::Filter(filter) => {
                self.filter = filter;
                if let Some(feed) = &self.feed {
                    feed.set_filter(filter);
                }
                Ok(format!("Filter: {}", filter))
            }
            Command::Search(text) => {
                if let Some(feed) = &self.feed {
                    feed.set_search(&text);
                }
                self.search = text;
                Ok(if self.search.is_empty() {
                    "Search cleared".to_string()
                } else {
                    format!("Search: {}", self.search)
                })
            }
            Command::Add(draft) => self.add(draft).await,
            Command::Done(reference) => self.set_completed(&reference, true).await,
            Command::Undo(reference) => self.set_completed(&reference, false).await,
            Command::Remove(reference) => {
                let id = self.resolve_task(&reference)?;
                self.app.task_engine.delete_task(id).await?;
                self.listing.retain(|listed| *listed != id);
                Ok("Task deleted".to_string())
            }
            Command::Show(reference) => self.show(&reference).await,
            Command::Stats => {
                let stats = self.app.task_engine.statistics_snapshot().await?;
                Ok(render_statistics(&stats))
            }
            Command::Users(search) => self.users(&search).await,
            Command::AddUser { fields, password } => {
                let username = fields.username.clone();
                self.app.user_engine.create_user(fields, &password).await?;
                Ok(format!("User {} created", username))
            }
            Command::DeleteUser(username) => {
                let user = self.resolve_user(&username).await?;
                self.app.user_engine.delete_user(user.id).await?;
                Ok(format!("User {} deleted", user.username))
            }
            Command::Passwd { current, new } => {
                let actor = self.app.auth.actor()?;
                self.app
                    .auth
                    .change_password(actor.id, &current, &new, true)
                    .await?;
                Ok("Password changed".to_string())
            }
            Command::ResetPassword { username, new } => {
                let user = self.resolve_user(&username).await?;
                self.app
                    .auth
                    .change_password(user.id, "", &new, false)
                    .await?;
                Ok(format!("Password for {} reset", user.username))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
        }
    }

    async fn login(&mut self, identifier: &str, password: &str) -> ShellResult<String> {
        match self.app.auth.login(identifier, password).await {
            AuthResult::Success(user) => {
                self.listing.clear();
                Ok(format!("Welcome, {}!", user.first_name))
            }
            AuthResult::Error(reason) => Err(ShellError::LoginFailed(reason.to_string())),
        }
    }

    async fn tasks(&mut self) -> ShellResult<String> {
        if !self.app.auth.state().is_authenticated() {
            return Ok("Not logged in".to_string());
        }

        let tasks = self.app.task_engine.list_tasks(self.filter, &self.search);
        self.listing = tasks.iter().map(|t| t.id).collect();
        if tasks.is_empty() {
            return Ok("No tasks".to_string());
        }

        let categories = self.category_names().await?;
        let now = Utc::now();
        let mut out = String::new();
        for (index, task) in tasks.iter().enumerate() {
            let _ = writeln!(out, "{:>3}. {}", index + 1, render_task_line(task, &categories, now));
        }
        Ok(out.trim_end().to_string())
    }

    async fn add(&mut self, draft: TaskDraft) -> ShellResult<String> {
        let actor = self.app.auth.actor()?;

        let category_id = self.resolve_category(draft.category.as_deref()).await?;
        let assigned_to = match draft.assignee.as_deref() {
            Some(username) => self.resolve_user(username).await?.id,
            None => actor.id,
        };
        let due_date = draft
            .due
            .and_then(|date| date.and_hms_opt(23, 59, 59))
            .map(|naive| Utc.from_utc_datetime(&naive));

        let input = NewTask {
            title: draft.title,
            description: None,
            priority: draft.priority.unwrap_or(Priority::Medium),
            due_date,
            category_id,
            assigned_to: Some(assigned_to),
        };
        let id = self.app.task_engine.create_task(input).await?;
        Ok(format!("Task created ({})", id))
    }

    async fn set_completed(&mut self, reference: &str, completed: bool) -> ShellResult<String> {
        let id = self.resolve_task(reference)?;
        self.app.task_engine.toggle_completion(id, completed).await?;
        Ok(if completed {
            "Task marked done".to_string()
        } else {
            "Task marked not done".to_string()
        })
    }

    async fn show(&self, reference: &str) -> ShellResult<String> {
        let id = self.resolve_task(reference)?;
        let details = self.app.task_engine.task_details(id).await?;
        let task = &details.task;

        let mut out = String::new();
        let _ = writeln!(out, "{}", task.title);
        let _ = writeln!(out, "  id:        {}", task.id);
        let _ = writeln!(out, "  status:    {}", if task.is_completed { "done" } else { "open" });
        let _ = writeln!(out, "  priority:  {}", task.priority);
        if let Some(category) = &details.category {
            let _ = writeln!(out, "  category:  {} ({})", category.name, category.color);
        }
        if let Some(due) = task.due_date {
            let overdue = if task.is_overdue(Utc::now()) { ", overdue" } else { "" };
            let _ = writeln!(out, "  due:       {}{}", due.format("%Y-%m-%d"), overdue);
        }
        let _ = writeln!(out, "  assignee:  {}", describe_user(details.assignee.as_ref()));
        let _ = writeln!(out, "  creator:   {}", describe_user(details.creator.as_ref()));
        let _ = writeln!(out, "  created:   {}", task.created_at.format("%Y-%m-%d %H:%M"));
        if let Some(description) = &task.description {
            let _ = writeln!(out, "\n{}", description);
        }
        Ok(out.trim_end().to_string())
    }

    async fn users(&self, search: &str) -> ShellResult<String> {
        if !self.app.auth.state().is_authenticated() {
            return Ok("Not logged in".to_string());
        }
        let users = self.app.user_engine.list_users(search);
        if users.is_empty() {
            return Ok("No users".to_string());
        }

        let mut out = String::new();
        for user in &users {
            let status = if user.is_active { "" } else { " [inactive]" };
            let _ = writeln!(
                out,
                "{:<12} {:<24} {:<28} {}{}",
                user.username,
                user.full_name(),
                user.email,
                user.role,
                status
            );
        }
        Ok(out.trim_end().to_string())
    }

    /// Accepts a number from the last listing or a full task id
    fn resolve_task(&self, reference: &str) -> ShellResult<TaskId> {
        if let Ok(number) = reference.parse::<usize>() {
            return number
                .checked_sub(1)
                .and_then(|index| self.listing.get(index))
                .copied()
                .ok_or_else(|| {
                    ShellError::BadArgument(format!(
                        "no task {} in the last listing; run 'tasks' first",
                        number
                    ))
                });
        }
        TaskId::parse(reference).ok_or_else(|| {
            ShellError::BadArgument(format!("'{}' is not a task number or id", reference))
        })
    }

    async fn resolve_user(&self, username: &str) -> ShellResult<User> {
        self.app.auth.actor()?;
        self.app
            .users
            .by_username(username)
            .await
            .map_err(taskdesk_shared::CoreError::from)?
            .ok_or_else(|| ShellError::BadArgument(format!("no user named '{}'", username)))
    }

    /// Looks up a category by name (case-insensitive); the first category
    /// when no name is given
    async fn resolve_category(&self, name: Option<&str>) -> ShellResult<CategoryId> {
        let categories = self.all_categories().await?;
        let found = match name {
            Some(name) => categories
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name)),
            None => categories.first(),
        };
        found.map(|c| c.id).ok_or_else(|| match name {
            Some(name) => ShellError::BadArgument(format!("no category named '{}'", name)),
            None => ShellError::BadArgument("no categories exist".to_string()),
        })
    }

    async fn all_categories(&self) -> ShellResult<Vec<Category>> {
        Ok(self
            .app
            .categories
            .all()
            .await
            .map_err(taskdesk_shared::CoreError::from)?)
    }

    async fn category_names(&self) -> ShellResult<HashMap<CategoryId, String>> {
        Ok(self
            .all_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect())
    }
}

fn render_task_line(
    task: &Task,
    categories: &HashMap<CategoryId, String>,
    now: chrono::DateTime<Utc>,
) -> String {
    let check = if task.is_completed { "x" } else { " " };
    let mut tags = vec![task.priority.to_string()];
    if let Some(name) = categories.get(&task.category_id) {
        tags.push(name.clone());
    }
    if let Some(due) = task.due_date {
        tags.push(format!("due {}", due.format("%Y-%m-%d")));
    }
    if task.is_overdue(now) && !task.is_completed {
        tags.push("overdue".to_string());
    }
    format!("[{}] {}  ({})", check, task.title, tags.join(", "))
}

fn render_statistics(stats: &TaskStatistics) -> String {
    format!(
        "Total: {}  Completed: {}  Pending: {}  Completion: {:.1}%",
        stats.total_tasks,
        stats.completed_tasks,
        stats.pending_tasks(),
        stats.completion_rate
    )
}

fn describe_user(user: Option<&User>) -> String {
    match user {
        Some(user) => format!("{} ({})", user.full_name(), user.username),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_login() {
        assert_eq!(
            Command::parse("login alice secret1").unwrap(),
            Some(Command::Login {
                identifier: "alice".to_string(),
                password: "secret1".to_string(),
            })
        );
        assert!(matches!(
            Command::parse("login alice"),
            Err(ShellError::Usage(_))
        ));
    }

    #[test]
    fn test_parse_add_with_tags() {
        let command = Command::parse("add Write quarterly report !high @bob #urgent due:2030-01-31")
            .unwrap()
            .unwrap();
        assert_eq!(
            command,
            Command::Add(TaskDraft {
                title: "Write quarterly report".to_string(),
                priority: Some(Priority::High),
                assignee: Some("bob".to_string()),
                category: Some("urgent".to_string()),
                due: NaiveDate::from_ymd_opt(2030, 1, 31),
            })
        );
    }

    #[test]
    fn test_parse_add_rejects_bad_date() {
        assert!(matches!(
            Command::parse("add Something due:31/01/2030"),
            Err(ShellError::BadArgument(_))
        ));
        assert!(matches!(Command::parse("add !high"), Err(ShellError::Usage(_))));
    }

    #[test]
    fn test_parse_filter_and_search() {
        assert_eq!(
            Command::parse("filter high").unwrap(),
            Some(Command::Filter(TaskFilter::HighPriority))
        );
        assert!(Command::parse("filter someday").is_err());
        assert_eq!(
            Command::parse("search  quarterly report ").unwrap(),
            Some(Command::Search("quarterly report".to_string()))
        );
        assert_eq!(Command::parse("search").unwrap(), Some(Command::Search(String::new())));
    }

    #[test]
    fn test_parse_passwd_forms() {
        assert_eq!(
            Command::parse("passwd --user bob Fresh2024").unwrap(),
            Some(Command::ResetPassword {
                username: "bob".to_string(),
                new: "Fresh2024".to_string(),
            })
        );
        assert!(matches!(
            Command::parse("passwd old new").unwrap(),
            Some(Command::Passwd { .. })
        ));
    }

    #[test]
    fn test_parse_adduser_role() {
        let Some(Command::AddUser { fields, .. }) =
            Command::parse("adduser carol carol@example.com Carol Danvers Carol2024 admin").unwrap()
        else {
            panic!("expected adduser");
        };
        assert_eq!(fields.role, Role::Admin);
        assert!(
            Command::parse("adduser carol carol@example.com Carol Danvers Carol2024 root").is_err()
        );
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            Command::parse("frobnicate"),
            Err(ShellError::UnknownCommand(name)) if name == "frobnicate"
        ));
    }

    #[test]
    fn test_render_statistics() {
        let stats = TaskStatistics::from_counts(4, 1);
        assert_eq!(
            render_statistics(&stats),
            "Total: 4  Completed: 1  Pending: 3  Completion: 25.0%"
        );
    }
}
