use serde::Serialize;

use foldwork_core::{AggregateId, ValidationErrors};
use foldwork_infra::{Command, CommandContext, CommandHandler, ExecuteError};

use crate::widget::{Widget, WidgetCreated, WidgetDiscontinued, WidgetRenamed};

/// Longest accepted widget name, in characters.
pub const MAX_NAME_LEN: usize = 64;

fn validate_name(name: &str, errors: &mut ValidationErrors) {
    let name = name.trim();
    errors.ensure(!name.is_empty(), "name", "is required");
    errors.ensure(
        name.chars().count() <= MAX_NAME_LEN,
        "name",
        format!("must be at most {MAX_NAME_LEN} characters"),
    );
}

/// Command: CreateWidget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateWidget {
    pub aggregate_id: AggregateId,
    pub name: String,
}

impl Command for CreateWidget {
    const COMMAND_TYPE: &'static str = "widget.create";
    type Output = AggregateId;

    fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    fn validate(&self, errors: &mut ValidationErrors) {
        validate_name(&self.name, errors);
    }
}

/// Command: RenameWidget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameWidget {
    pub aggregate_id: AggregateId,
    pub name: String,
}

impl Command for RenameWidget {
    const COMMAND_TYPE: &'static str = "widget.rename";
    type Output = ();

    fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    fn validate(&self, errors: &mut ValidationErrors) {
        validate_name(&self.name, errors);
    }
}

/// Command: DiscontinueWidget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscontinueWidget {
    pub aggregate_id: AggregateId,
}

impl Command for DiscontinueWidget {
    const COMMAND_TYPE: &'static str = "widget.discontinue";
    type Output = ();

    fn aggregate_id(&self) -> &AggregateId {
        &self.aggregate_id
    }

    fn validate(&self, _errors: &mut ValidationErrors) {}
}

pub struct CreateWidgetHandler {
    command: CreateWidget,
}

impl CommandHandler for CreateWidgetHandler {
    const NAME: &'static str = "create_widget";
    type Command = CreateWidget;
    type Aggregate = Widget;

    fn new(command: CreateWidget) -> Self {
        Self { command }
    }

    fn execute(self, ctx: &mut CommandContext<'_>) -> Result<AggregateId, ExecuteError> {
        let mut widget: Widget = ctx.load_target()?;
        widget.ensure_absent()?;

        let name = self.command.name.trim().to_string();
        ctx.apply(&mut widget, &WidgetCreated { name })?;
        Ok(self.command.aggregate_id)
    }
}

pub struct RenameWidgetHandler {
    command: RenameWidget,
}

impl CommandHandler for RenameWidgetHandler {
    const NAME: &'static str = "rename_widget";
    type Command = RenameWidget;
    type Aggregate = Widget;

    fn new(command: RenameWidget) -> Self {
        Self { command }
    }

    fn execute(self, ctx: &mut CommandContext<'_>) -> Result<(), ExecuteError> {
        let mut widget: Widget = ctx.load_target()?;
        widget.ensure_active()?;

        let name = self.command.name.trim();
        // Renaming to the current name records nothing.
        if name == widget.name() {
            return Ok(());
        }
        ctx.apply(
            &mut widget,
            &WidgetRenamed {
                name: name.to_string(),
            },
        )?;
        Ok(())
    }
}

pub struct DiscontinueWidgetHandler;

impl CommandHandler for DiscontinueWidgetHandler {
    const NAME: &'static str = "discontinue_widget";
    type Command = DiscontinueWidget;
    type Aggregate = Widget;

    fn new(_command: DiscontinueWidget) -> Self {
        Self
    }

    fn execute(self, ctx: &mut CommandContext<'_>) -> Result<(), ExecuteError> {
        let mut widget: Widget = ctx.load_target()?;
        widget.ensure_active()?;
        ctx.apply(&mut widget, &WidgetDiscontinued {})?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_required_and_bounded() {
        let id = AggregateId::from("w1");
        let blank = CreateWidget {
            aggregate_id: id.clone(),
            name: "   ".into(),
        };
        let long = RenameWidget {
            aggregate_id: id.clone(),
            name: "x".repeat(MAX_NAME_LEN + 1),
        };
        let exact = CreateWidget {
            aggregate_id: id,
            name: "é".repeat(MAX_NAME_LEN),
        };

        let errors = blank.check().unwrap_err();
        assert_eq!(errors.on("name").collect::<Vec<_>>(), vec!["is required"]);
        let errors = long.check().unwrap_err();
        assert_eq!(
            errors.on("name").collect::<Vec<_>>(),
            vec!["must be at most 64 characters"]
        );
        assert!(exact.is_valid());
    }

    #[test]
    fn discontinue_only_needs_an_id() {
        assert!(
            DiscontinueWidget {
                aggregate_id: AggregateId::from("w1")
            }
            .is_valid()
        );
        assert!(
            !DiscontinueWidget {
                aggregate_id: AggregateId::from(" ")
            }
            .is_valid()
        );
    }
}
