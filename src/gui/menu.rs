//! Dropdown menu: a trigger button that discloses a panel of items.
//!
//! Children are passed as tagged [`MenuSlot`]s. The menu only knows the three
//! roles; what an item does is carried as an opaque action value that `show`
//! hands back to the caller.

use egui::{Id, Pos2, Rect, WidgetText};

/// Width of the disclosed panel, independent of the space around the trigger.
pub const CONTENT_WIDTH: f32 = 192.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    TriggerActivated,
    /// A pointer button went down somewhere in the window.
    PointerDown { inside: bool },
    EscapePressed,
}

pub struct MenuItem<A> {
    pub label: WidgetText,
    pub action: A,
}

impl<A> MenuItem<A> {
    pub fn new(label: impl Into<WidgetText>, action: A) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

pub enum MenuSlot<A> {
    /// Toggles the menu when clicked.
    Trigger(WidgetText),
    /// Drawn only while the menu is open.
    Content(Vec<MenuItem<A>>),
    /// Drawn as-is.
    Label(WidgetText),
}

/// Per-instance menu state. Dropping it (with the card that owns it) is the
/// only teardown needed: the outside-press check runs only while `show` is
/// being called.
pub struct DropdownMenu {
    id: Id,
    state: MenuState,
    /// Rects drawn during the last `show`; a press outside all of them closes the menu.
    bounds: Vec<Rect>,
}

impl DropdownMenu {
    pub fn new(id: Id) -> Self {
        Self {
            id,
            state: MenuState::Closed,
            bounds: Vec::new(),
        }
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == MenuState::Open
    }

    pub fn close(&mut self) {
        self.state = MenuState::Closed;
    }

    pub fn apply(&mut self, event: MenuEvent) {
        self.state = match (self.state, event) {
            (MenuState::Closed, MenuEvent::TriggerActivated) => MenuState::Open,
            (MenuState::Open, MenuEvent::TriggerActivated) => MenuState::Closed,
            (MenuState::Open, MenuEvent::PointerDown { inside: false }) => MenuState::Closed,
            (MenuState::Open, MenuEvent::EscapePressed) => MenuState::Closed,
            (state, _) => state,
        };
    }

    pub fn contains(&self, pos: Pos2) -> bool {
        self.bounds.iter().any(|r| r.contains(pos))
    }

    pub fn pointer_down_at(&mut self, pos: Pos2) {
        let inside = self.contains(pos);
        self.apply(MenuEvent::PointerDown { inside });
    }

    /// Whether a slot is part of the drawn tree in the current state.
    pub fn renders<A>(&self, slot: &MenuSlot<A>) -> bool {
        match slot {
            MenuSlot::Content(_) => self.is_open(),
            MenuSlot::Trigger(_) | MenuSlot::Label(_) => true,
        }
    }

    /// Draws the menu and returns the action of the item clicked this frame, if any.
    pub fn show<A: Clone>(&mut self, ui: &mut egui::Ui, slots: &[MenuSlot<A>]) -> Option<A> {
        let mut bounds = Vec::with_capacity(slots.len());
        let mut anchor = ui.cursor().left_top();
        let mut toggled = false;
        let mut selected = None;

        for slot in slots {
            if !self.renders(slot) {
                continue;
            }
            match slot {
                MenuSlot::Trigger(text) => {
                    let response = ui.button(text.clone());
                    anchor = response.rect.right_bottom();
                    bounds.push(response.rect);
                    toggled |= response.clicked();
                }
                MenuSlot::Label(text) => {
                    bounds.push(ui.label(text.clone()).rect);
                }
                MenuSlot::Content(items) => {
                    let area = egui::Area::new(self.id.with("content"))
                        .order(egui::Order::Foreground)
                        .pivot(egui::Align2::RIGHT_TOP)
                        .fixed_pos(anchor)
                        .show(ui.ctx(), |ui| {
                            egui::Frame::popup(ui.style())
                                .show(ui, |ui| {
                                    ui.set_width(CONTENT_WIDTH);
                                    let mut picked = None;
                                    for item in items {
                                        let button = egui::Button::new(item.label.clone())
                                            .frame(false)
                                            .min_size(egui::vec2(CONTENT_WIDTH, 0.0));
                                        if ui.add(button).clicked() {
                                            picked = Some(item.action.clone());
                                        }
                                    }
                                    picked
                                })
                                .inner
                        });
                    bounds.push(area.response.rect);
                    selected = selected.or(area.inner);
                }
            }
        }

        self.bounds = bounds;

        let (pressed_at, escape) = ui.input(|i| {
            let pressed = if i.pointer.any_pressed() {
                i.pointer.interact_pos()
            } else {
                None
            };
            (pressed, i.key_pressed(egui::Key::Escape))
        });
        if let Some(pos) = pressed_at {
            self.pointer_down_at(pos);
        }
        if escape {
            self.apply(MenuEvent::EscapePressed);
        }
        if toggled {
            self.apply(MenuEvent::TriggerActivated);
        }

        selected
    }
}
