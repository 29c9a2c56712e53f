use crate::domain::component::{Button, ButtonStyle, SelectMenu, SelectOption};
use crate::domain::ports::ComponentHandler;
use crate::utils::error::{PincerError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Handlers for message components, keyed by `custom_id`.
#[derive(Default)]
pub struct ComponentRegistry {
    handlers: HashMap<String, Arc<dyn ComponentHandler>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` and returns the button to put in an action row.
    pub fn button(
        &mut self,
        custom_id: impl Into<String>,
        style: ButtonStyle,
        label: impl Into<String>,
        handler: impl ComponentHandler + 'static,
    ) -> Result<Button> {
        if style == ButtonStyle::Link {
            return Err(PincerError::InvalidComponent {
                message: "link buttons open a url and take no handler, use Button::link".to_string(),
            });
        }

        let custom_id = custom_id.into();
        let button = Button::new(style, label).custom_id(custom_id.clone());
        button.validate()?;

        self.component(custom_id, handler)?;
        Ok(button)
    }

    pub fn select_menu(
        &mut self,
        custom_id: impl Into<String>,
        options: Vec<SelectOption>,
        handler: impl ComponentHandler + 'static,
    ) -> Result<SelectMenu> {
        let custom_id = custom_id.into();
        let menu = SelectMenu::new(custom_id.clone(), options);
        menu.validate()?;

        self.component(custom_id, handler)?;
        Ok(menu)
    }

    /// Handler for a component built by hand with the same `custom_id`.
    pub fn component(
        &mut self,
        custom_id: impl Into<String>,
        handler: impl ComponentHandler + 'static,
    ) -> Result<()> {
        let custom_id = custom_id.into();
        if custom_id.is_empty() || custom_id.chars().count() > 100 {
            return Err(PincerError::InvalidComponent {
                message: format!("custom_id `{}` must be 1 to 100 characters", custom_id),
            });
        }
        if self.handlers.contains_key(&custom_id) {
            return Err(PincerError::InvalidComponent {
                message: format!("a handler for `{}` is already registered", custom_id),
            });
        }

        tracing::info!("Registered component `{}` locally.", custom_id);
        self.handlers.insert(custom_id, Arc::new(handler));
        Ok(())
    }

    pub fn get(&self, custom_id: &str) -> Option<Arc<dyn ComponentHandler>> {
        self.handlers.get(custom_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("custom_ids", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
