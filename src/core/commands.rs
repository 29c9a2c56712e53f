use crate::domain::channel::ChannelType;
use crate::domain::command::{
    AppCommand, AppCommandOption, AppCommandOptionChoice, AppCommandOptionType, AppCommandType,
    ChoiceValue, ThrottleScope,
};
use crate::domain::ports::CommandHandler;
use crate::utils::error::{PincerError, Result};
use crate::utils::snowflake::Snowflake;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_DESCRIPTION: &str = "Description not set";

const CHAT_INPUT_NAME_PATTERN: &str = r"^[a-z0-9_-]{1,32}$";
const REGULAR_NAME_PATTERN: &str = r"^[\w\- ]{1,32}$";
const MAX_DESCRIPTION_LEN: usize = 100;
const MAX_OPTIONS: usize = 25;
const MAX_CHOICES: usize = 25;

/// One option of a chat input command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandArg {
    option: AppCommandOption,
}

impl CommandArg {
    /// Arguments are required unless [`CommandArg::optional`] is called.
    pub fn new(name: impl Into<String>, kind: AppCommandOptionType) -> Self {
        let mut option = AppCommandOption::new(kind, name, DEFAULT_DESCRIPTION);
        option.required = Some(true);
        Self { option }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::String)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::Integer)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::Boolean)
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::User)
    }

    pub fn channel(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::Channel)
    }

    pub fn role(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::Role)
    }

    pub fn mentionable(name: impl Into<String>) -> Self {
        Self::new(name, AppCommandOptionType::Mentionable)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.option.description = description.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.option.required = Some(required);
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    pub fn choice(mut self, name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        self.option
            .choices
            .get_or_insert_with(Vec::new)
            .push(AppCommandOptionChoice::new(name, value));
        self
    }

    pub fn channel_types(mut self, types: impl IntoIterator<Item = ChannelType>) -> Self {
        self.option.channel_types = Some(types.into_iter().collect());
        self
    }

    pub fn min_value(mut self, value: f64) -> Self {
        self.option.min_value = Some(value);
        self
    }

    pub fn max_value(mut self, value: f64) -> Self {
        self.option.max_value = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.option.name
    }

    pub fn into_option(self) -> AppCommandOption {
        self.option
    }

    fn validate(&self, command: &str) -> Result<()> {
        let opt = &self.option;

        if !name_matches(CHAT_INPUT_NAME_PATTERN, &opt.name)? {
            return Err(PincerError::InvalidArgumentAnnotation {
                message: format!(
                    "Argument `{}` of `{}` doesn't follow the name requirements: {}",
                    opt.name, command, CHAT_INPUT_NAME_PATTERN
                ),
            });
        }

        if opt.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(PincerError::CommandDescriptionTooLong {
                message: format!(
                    "Argument `{}` of `{}` has a description over {} characters",
                    opt.name, command, MAX_DESCRIPTION_LEN
                ),
            });
        }

        if let Some(choices) = &opt.choices {
            if !opt.kind.accepts_choices() {
                return Err(annotation_error("Choice type is only allowed for str, int, and float"));
            }
            if choices.len() > MAX_CHOICES {
                return Err(annotation_error(format!(
                    "Argument `{}` has {} choices, the maximum is {}",
                    opt.name,
                    choices.len(),
                    MAX_CHOICES
                )));
            }
            if choices.iter().any(|c| !c.value.fits(opt.kind)) {
                return Err(annotation_error("Choice value must match the command type"));
            }
        }

        if opt.channel_types.is_some() && opt.kind != AppCommandOptionType::Channel {
            return Err(annotation_error("ChannelTypes are only available for Channels"));
        }

        if opt.min_value.is_some() && !opt.kind.is_numeric() {
            return Err(annotation_error("MinValue is only available for int and float"));
        }
        if opt.max_value.is_some() && !opt.kind.is_numeric() {
            return Err(annotation_error("MaxValue is only available for int and float"));
        }

        Ok(())
    }
}

/// Top level chat input command that holds sub commands.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub description: Option<String>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn description_or_default(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
    }
}

/// Sub command group nested inside a [`Group`].
#[derive(Debug, Clone, PartialEq)]
pub struct Subgroup {
    pub name: String,
    pub description: Option<String>,
    pub parent: Group,
}

impl Subgroup {
    pub fn new(name: impl Into<String>, parent: Group) -> Self {
        Self {
            name: name.into(),
            description: None,
            parent,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn description_or_default(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    Group(Group),
    Subgroup(Subgroup),
}

impl From<Group> for Parent {
    fn from(g: Group) -> Self {
        Parent::Group(g)
    }
}

impl From<Subgroup> for Parent {
    fn from(s: Subgroup) -> Self {
        Parent::Subgroup(s)
    }
}

/// Command definition handed to [`CommandRegistry::register`].
pub struct Command {
    kind: AppCommandType,
    name: String,
    description: Option<String>,
    enable_default: bool,
    guild: Option<String>,
    cooldown: u32,
    cooldown_scale: f64,
    cooldown_scope: ThrottleScope,
    parent: Option<Parent>,
    args: Vec<CommandArg>,
    handler: Option<Arc<dyn CommandHandler>>,
}

impl Command {
    fn new(kind: AppCommandType, name: impl Into<String>) -> Self {
        let description = match kind {
            AppCommandType::ChatInput => Some(DEFAULT_DESCRIPTION.to_string()),
            _ => None,
        };

        Self {
            kind,
            name: name.into(),
            description,
            enable_default: true,
            guild: None,
            cooldown: 0,
            cooldown_scale: 60.0,
            cooldown_scope: ThrottleScope::User,
            parent: None,
            args: Vec::new(),
            handler: None,
        }
    }

    pub fn chat_input(name: impl Into<String>) -> Self {
        Self::new(AppCommandType::ChatInput, name)
    }

    /// Context menu command on a user. The handler receives `target_id`,
    /// `user` and `member` arguments.
    pub fn user(name: impl Into<String>) -> Self {
        Self::new(AppCommandType::User, name)
    }

    /// Context menu command on a message. The handler receives `target_id`
    /// and `message` arguments.
    pub fn message(name: impl Into<String>) -> Self {
        Self::new(AppCommandType::Message, name)
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn enable_default(mut self, enable: bool) -> Self {
        self.enable_default = enable;
        self
    }

    /// Registers the command in one guild instead of globally.
    pub fn guild(mut self, guild: impl ToString) -> Self {
        self.guild = Some(guild.to_string());
        self
    }

    /// Allowed invocations per `cooldown_scale` seconds, 0 disables.
    pub fn cooldown(mut self, cooldown: u32) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn cooldown_scale(mut self, seconds: f64) -> Self {
        self.cooldown_scale = seconds;
        self
    }

    pub fn cooldown_scope(mut self, scope: ThrottleScope) -> Self {
        self.cooldown_scope = scope;
        self
    }

    pub fn parent(mut self, parent: impl Into<Parent>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn arg(mut self, arg: CommandArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn handler(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn shared_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// A validated command with everything the middleware needs to run it.
pub struct RegisteredCommand {
    pub app: AppCommand,
    pub handler: Arc<dyn CommandHandler>,
    pub cooldown: u32,
    pub cooldown_scale: f64,
    pub cooldown_scope: ThrottleScope,
    pub group: Option<Group>,
    pub sub_group: Option<Subgroup>,
}

impl RegisteredCommand {
    fn key(&self) -> CommandKey {
        CommandKey {
            name: self.app.name.clone(),
            guild_id: self.app.guild_id,
            kind: self.app.kind,
            group: self.group.as_ref().map(|g| g.name.clone()),
            sub_group: self.sub_group.as_ref().map(|s| s.name.clone()),
        }
    }

    /// `group subgroup name` as typed in the Discord client.
    pub fn qualified_name(&self) -> String {
        [
            self.group.as_ref().map(|g| g.name.as_str()),
            self.sub_group.as_ref().map(|s| s.name.as_str()),
            Some(self.app.name.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("app", &self.app)
            .field("cooldown", &self.cooldown)
            .field("cooldown_scale", &self.cooldown_scale)
            .field("cooldown_scope", &self.cooldown_scope)
            .field("group", &self.group)
            .field("sub_group", &self.sub_group)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CommandKey {
    name: String,
    guild_id: Option<Snowflake>,
    kind: AppCommandType,
    group: Option<String>,
    sub_group: Option<String>,
}

/// Local command register. Kept flat; [`CommandRegistry::build_local_commands`]
/// produces the nested shape Discord stores.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<RegisteredCommand>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) -> Result<Arc<RegisteredCommand>> {
        let name = command.name.clone();

        let pattern = match command.kind {
            AppCommandType::ChatInput => CHAT_INPUT_NAME_PATTERN,
            _ => REGULAR_NAME_PATTERN,
        };
        if !name_matches(pattern, &name)? {
            return Err(PincerError::InvalidCommandName {
                message: format!(
                    "Command `{}` doesn't follow the name requirements. \
                     Ensure to match the following regex: {}",
                    name, pattern
                ),
            });
        }

        let handler = command.handler.clone().ok_or_else(|| PincerError::HandlerError {
            message: format!("Command `{}` has no handler", name),
        })?;

        let guild_id = match &command.guild {
            Some(guild) => Some(guild.parse::<Snowflake>().map_err(|_| {
                PincerError::InvalidCommandGuild {
                    message: format!(
                        "Command `{}` its `guild` parameter `{}` is not a valid guild id.",
                        name, guild
                    ),
                }
            })?),
            None => None,
        };

        if let Some(description) = &command.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(PincerError::CommandDescriptionTooLong {
                    message: format!(
                        "Command `{}` its description exceeds the {} character limit.",
                        name, MAX_DESCRIPTION_LEN
                    ),
                });
            }
        }

        if command.args.len() > MAX_OPTIONS {
            return Err(PincerError::TooManyArguments {
                message: format!(
                    "Command `{}` can only have {} arguments yet {} were provided!",
                    name,
                    MAX_OPTIONS,
                    command.args.len()
                ),
            });
        }

        if command.kind != AppCommandType::ChatInput {
            if !command.args.is_empty() {
                return Err(annotation_error(format!(
                    "Command `{}` is a context menu command and takes no arguments",
                    name
                )));
            }
            if command.parent.is_some() {
                return Err(PincerError::InvalidCommandName {
                    message: format!("Only chat input commands can be grouped, `{}` is not one", name),
                });
            }
        }

        for arg in &command.args {
            arg.validate(&name)?;
        }

        let (group, sub_group) = match &command.parent {
            Some(Parent::Group(g)) => (Some(g.clone()), None),
            Some(Parent::Subgroup(s)) => (Some(s.parent.clone()), Some(s.clone())),
            None => (None, None),
        };
        for parent_name in group
            .iter()
            .map(|g| &g.name)
            .chain(sub_group.iter().map(|s| &s.name))
        {
            if !name_matches(CHAT_INPUT_NAME_PATTERN, parent_name)? {
                return Err(PincerError::InvalidCommandName {
                    message: format!(
                        "Group `{}` doesn't follow the name requirements: {}",
                        parent_name, CHAT_INPUT_NAME_PATTERN
                    ),
                });
            }
        }

        let options: Vec<AppCommandOption> =
            command.args.into_iter().map(CommandArg::into_option).collect();

        let mut app = AppCommand::new(
            command.kind,
            name.clone(),
            command.description.unwrap_or_default(),
        );
        app.guild_id = guild_id;
        app.default_permission = Some(command.enable_default);
        app.options = if options.is_empty() { None } else { Some(options) };

        let registered = RegisteredCommand {
            app,
            handler,
            cooldown: command.cooldown,
            cooldown_scale: command.cooldown_scale,
            cooldown_scope: command.cooldown_scope,
            group,
            sub_group,
        };

        let key = registered.key();
        if self.commands.iter().any(|c| c.key() == key) {
            return Err(PincerError::CommandAlreadyRegistered {
                message: format!("Command `{}` has already been registered.", registered.qualified_name()),
            });
        }

        tracing::info!("Registered command `{}` locally.", registered.qualified_name());

        let registered = Arc::new(registered);
        self.commands.push(Arc::clone(&registered));
        Ok(registered)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredCommand>> {
        self.commands.iter()
    }

    /// Looks a command up by its full key; a guild scoped lookup falls back to
    /// the global command of the same name.
    pub fn find(
        &self,
        name: &str,
        guild_id: Option<Snowflake>,
        kind: AppCommandType,
        group: Option<&str>,
        sub_group: Option<&str>,
    ) -> Option<Arc<RegisteredCommand>> {
        let lookup = |guild_id: Option<Snowflake>| {
            self.commands
                .iter()
                .find(|c| {
                    c.app.name == name
                        && c.app.guild_id == guild_id
                        && c.app.kind == kind
                        && c.group.as_ref().map(|g| g.name.as_str()) == group
                        && c.sub_group.as_ref().map(|s| s.name.as_str()) == sub_group
                })
                .cloned()
        };

        lookup(guild_id).or_else(|| guild_id.and(lookup(None)))
    }

    /// The registered commands in the nested shape Discord expects.
    pub fn build_local_commands(&self) -> Vec<AppCommand> {
        let mut built: Vec<AppCommand> = Vec::new();

        for cmd in &self.commands {
            let Some(group) = &cmd.group else {
                built.push(cmd.app.clone());
                continue;
            };

            let idx = match built.iter().position(|c| {
                c.name == group.name
                    && c.guild_id == cmd.app.guild_id
                    && c.kind == AppCommandType::ChatInput
                    && c.options
                        .as_ref()
                        .and_then(|o| o.first())
                        .map(|o| {
                            matches!(
                                o.kind,
                                AppCommandOptionType::SubCommand | AppCommandOptionType::SubCommandGroup
                            )
                        })
                        .unwrap_or(false)
            }) {
                Some(idx) => idx,
                None => {
                    let mut top = AppCommand::new(
                        AppCommandType::ChatInput,
                        group.name.clone(),
                        group.description_or_default(),
                    );
                    top.guild_id = cmd.app.guild_id;
                    top.options = Some(Vec::new());
                    built.push(top);
                    built.len() - 1
                }
            };

            let mut sub_command = AppCommandOption::new(
                AppCommandOptionType::SubCommand,
                cmd.app.name.clone(),
                cmd.app.description.clone(),
            );
            sub_command.options = cmd.app.options.clone();

            let children = built[idx].options.get_or_insert_with(Vec::new);

            match &cmd.sub_group {
                None => children.push(sub_command),
                Some(sub_group) => {
                    let pos = children.iter().position(|o| {
                        o.kind == AppCommandOptionType::SubCommandGroup && o.name == sub_group.name
                    });
                    let pos = match pos {
                        Some(pos) => pos,
                        None => {
                            let mut option = AppCommandOption::new(
                                AppCommandOptionType::SubCommandGroup,
                                sub_group.name.clone(),
                                sub_group.description_or_default(),
                            );
                            option.options = Some(Vec::new());
                            children.push(option);
                            children.len() - 1
                        }
                    };
                    children[pos]
                        .options
                        .get_or_insert_with(Vec::new)
                        .push(sub_command);
                }
            }
        }

        built
    }
}

fn name_matches(pattern: &str, name: &str) -> Result<bool> {
    let re = Regex::new(pattern).map_err(|e| PincerError::ConfigError {
        message: format!("invalid name pattern: {}", e),
    })?;
    Ok(re.is_match(name))
}

fn annotation_error(message: impl Into<String>) -> PincerError {
    PincerError::InvalidArgumentAnnotation {
        message: message.into(),
    }
}
