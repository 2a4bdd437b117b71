use std::sync::{mpsc, Arc};
use std::time::Duration;

use egui::{Color32, ColorImage, Rect, RichText, Sense, TextureHandle};

use crate::config::Config;
use crate::core::download;
use crate::core::playback::{AudioLoader, AudioTicket};
use crate::core::view::{PlaybackCommand, SearchTicket, ViewState};
use crate::gui::menu::{DropdownMenu, MenuItem, MenuSlot};
use crate::gui::player::Player;
use crate::models::Song;
use crate::sources::saavn::SaavnClient;
use crate::sources::SongSource;

const CARD_WIDTH: f32 = 200.0;
const THUMB_SIZE: f32 = 184.0;
const OVERLAY_RADIUS: f32 = 24.0;
const ERROR_COLOR: Color32 = Color32::from_rgb(248, 113, 113);

// System fonts covering scripts the default egui fonts lack.
const FALLBACK_FONTS: &[(&str, &[&str])] = &[
    (
        "cjk",
        &[
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
            "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        ],
    ),
    (
        "devanagari",
        &[
            "/System/Library/Fonts/Kohinoor.ttc",
            "/usr/share/fonts/truetype/noto/NotoSansDevanagari-Regular.ttf",
            "/usr/share/fonts/noto/NotoSansDevanagari-Regular.ttf",
            "C:\\Windows\\Fonts\\Nirmala.ttf",
        ],
    ),
];

enum BgResult {
    SearchDone(SearchTicket, anyhow::Result<Vec<Song>>),
    ThumbnailDone(SearchTicket, usize, Vec<u8>),
    AudioReady(AudioTicket, Vec<u8>),
    AudioFailed(AudioTicket),
    DownloadReady(String, Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
enum CardAction {
    TogglePlayback(String),
    Download { name: String, url: Option<String> },
}

/// Where the last frame drew a card's parts.
#[derive(Debug, Clone, Copy)]
struct CardLayout {
    thumbnail: Rect,
    overlay: Option<Rect>,
    meta: Rect,
}

// `Rect` has no `Default`; these placeholders are overwritten by the first `show`.
impl Default for CardLayout {
    fn default() -> Self {
        Self {
            thumbnail: Rect::NOTHING,
            overlay: None,
            meta: Rect::NOTHING,
        }
    }
}

/// One rendered search result. Owns its menu, so menu state lives and dies with the card.
struct ResultCard {
    song: Song,
    menu: DropdownMenu,
    thumbnail: Option<TextureHandle>,
    layout: CardLayout,
}

impl ResultCard {
    fn new(index: usize, song: Song) -> Self {
        let menu = DropdownMenu::new(egui::Id::new(("song_menu", index, &song.id)));
        Self {
            song,
            menu,
            thumbnail: None,
            layout: CardLayout::default(),
        }
    }

    fn menu_slots(&self) -> Vec<MenuSlot<CardAction>> {
        vec![
            MenuSlot::Trigger("⋮".into()),
            MenuSlot::Content(vec![MenuItem::new(
                "Download",
                CardAction::Download {
                    name: self.song.name.clone(),
                    url: self.song.audio_url().map(str::to_string),
                },
            )]),
        ]
    }

    fn show(
        &mut self,
        ui: &mut egui::Ui,
        playing: bool,
        buffering: bool,
        position: Option<Duration>,
    ) -> Option<CardAction> {
        let mut action = None;
        let play_icon = if playing { "⏸" } else { "▶" };

        egui::Frame::group(ui.style())
            .rounding(8.0)
            .show(ui, |ui| {
                ui.set_width(CARD_WIDTH);
                ui.vertical(|ui| {
                    let thumb_rect = self.show_thumbnail(ui);
                    self.layout.thumbnail = thumb_rect;
                    self.layout.overlay = None;

                    // Painted over the thumbnail; the layout cursor stays below it.
                    if self.song.is_playable() {
                        let rect = Rect::from_center_size(
                            thumb_rect.center(),
                            egui::Vec2::splat(OVERLAY_RADIUS * 2.0),
                        );
                        let response =
                            ui.interact(rect, ui.id().with(("play_overlay", &self.song.id)), Sense::click());
                        let fill = if response.hovered() {
                            Color32::from_black_alpha(200)
                        } else {
                            Color32::from_black_alpha(150)
                        };
                        let painter = ui.painter();
                        painter.circle_filled(rect.center(), OVERLAY_RADIUS, fill);
                        painter.text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            play_icon,
                            egui::FontId::proportional(26.0),
                            Color32::WHITE,
                        );
                        if response.clicked() {
                            action = Some(CardAction::TogglePlayback(self.song.id.clone()));
                        }
                        self.layout.overlay = Some(rect);
                    }

                    let meta = ui.horizontal(|ui| {
                        ui.vertical(|ui| {
                            ui.set_width(CARD_WIDTH - 36.0);
                            ui.add(egui::Label::new(RichText::new(&self.song.name).strong()).truncate());
                            ui.add(
                                egui::Label::new(RichText::new(self.song.display_artists()).weak())
                                    .truncate(),
                            );
                        });

                        let slots = self.menu_slots();
                        if let Some(selected) = self.menu.show(ui, &slots) {
                            self.menu.close();
                            action = Some(selected);
                        }
                    });
                    self.layout.meta = meta.response.rect;

                    if self.song.is_playable() {
                        ui.horizontal(|ui| {
                            if ui.small_button(play_icon).clicked() {
                                action = Some(CardAction::TogglePlayback(self.song.id.clone()));
                            }
                            ui.label(format_elapsed(position.unwrap_or_default()));
                            if buffering {
                                ui.spinner();
                            }
                        });
                    }
                });
            });

        action
    }

    fn show_thumbnail(&self, ui: &mut egui::Ui) -> Rect {
        let size = egui::vec2(THUMB_SIZE, THUMB_SIZE);
        if let Some(texture) = &self.thumbnail {
            return ui
                .image(egui::load::SizedTexture::new(texture.id(), size))
                .rect;
        }

        let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
        let painter = ui.painter();
        painter.rect_filled(rect, 6.0, Color32::from_gray(45));
        painter.text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "🎵",
            egui::FontId::proportional(48.0),
            Color32::from_gray(110),
        );
        rect
    }
}

pub struct PlayerApp {
    config: Config,
    source: Arc<SaavnClient>,

    view: ViewState,
    cards: Vec<ResultCard>,
    results_ticket: Option<SearchTicket>,

    // Audio
    player: Option<Player>,
    audio: AudioLoader,

    // Background tasks
    tx: mpsc::Sender<BgResult>,
    rx: mpsc::Receiver<BgResult>,
}

impl PlayerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, source: SaavnClient) -> Self {
        Self::setup_fallback_fonts(&cc.egui_ctx);
        cc.egui_ctx.set_visuals(egui::Visuals::dark());
        let (tx, rx) = mpsc::channel();

        let player = match Player::new(config.playback.clamped_volume()) {
            Ok(player) => Some(player),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "audio output unavailable, playback disabled");
                None
            }
        };

        Self {
            config,
            source: Arc::new(source),
            view: ViewState::new(),
            cards: Vec::new(),
            results_ticket: None,
            player,
            audio: AudioLoader::new(),
            tx,
            rx,
        }
    }

    fn setup_fallback_fonts(ctx: &egui::Context) {
        let mut fonts = egui::FontDefinitions::default();
        let mut added = false;

        for (name, paths) in FALLBACK_FONTS {
            let Some(font_data) = paths.iter().find_map(|p| std::fs::read(p).ok()) else {
                continue;
            };
            fonts
                .font_data
                .insert(name.to_string(), egui::FontData::from_owned(font_data));

            // Appended after the defaults so Latin text keeps the egui font.
            for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
                if let Some(list) = fonts.families.get_mut(&family) {
                    list.push(name.to_string());
                }
            }
            added = true;
        }

        if added {
            ctx.set_fonts(fonts);
        }
    }

    fn start_search(&mut self, ctx: &egui::Context) {
        let Some(req) = self.view.begin_search() else {
            return;
        };
        self.cards.clear();
        self.results_ticket = None;
        self.stop_audio();

        let tx = self.tx.clone();
        let source = Arc::clone(&self.source);
        let ctx = ctx.clone();

        std::thread::spawn(move || {
            let outcome = source.search(&req.query);
            let _ = tx.send(BgResult::SearchDone(req.ticket, outcome));
            ctx.request_repaint();
        });
    }

    fn fetch_thumbnails(&self, ticket: SearchTicket, ctx: &egui::Context) {
        for (index, card) in self.cards.iter().enumerate() {
            let Some(url) = card.song.thumbnail_url().map(str::to_string) else {
                continue;
            };
            let tx = self.tx.clone();
            let source = Arc::clone(&self.source);
            let ctx = ctx.clone();

            std::thread::spawn(move || match source.fetch_bytes(&url) {
                Ok(data) => {
                    let _ = tx.send(BgResult::ThumbnailDone(ticket, index, data));
                    ctx.request_repaint();
                }
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "thumbnail unavailable");
                }
            });
        }
    }

    fn toggle_playback(&mut self, ctx: &egui::Context, id: &str) {
        match self.view.toggle_playback(id) {
            PlaybackCommand::Pause => {
                self.audio.cancel();
                if let Some(player) = &mut self.player {
                    player.pause();
                }
            }
            PlaybackCommand::Play(id) => {
                let Some(player) = &mut self.player else {
                    tracing::error!(track = %id, "cannot play without an audio output");
                    self.view.on_audio_stopped();
                    return;
                };
                if player.resume(&id) {
                    return;
                }
                player.stop();

                let Some(url) = self
                    .cards
                    .iter()
                    .find(|c| c.song.id == id)
                    .and_then(|c| c.song.audio_url())
                    .map(str::to_string)
                else {
                    self.view.on_audio_stopped();
                    return;
                };

                let ticket = self.audio.begin(&id);
                let tx = self.tx.clone();
                let source = Arc::clone(&self.source);
                let ctx = ctx.clone();

                std::thread::spawn(move || {
                    let result = match source.fetch_bytes(&url) {
                        Ok(data) => BgResult::AudioReady(ticket, data),
                        Err(e) => {
                            tracing::error!(track = %id, error = %format!("{:#}", e), "audio fetch failed");
                            BgResult::AudioFailed(ticket)
                        }
                    };
                    let _ = tx.send(result);
                    ctx.request_repaint();
                });
            }
        }
    }

    fn stop_audio(&mut self) {
        self.audio.cancel();
        if let Some(player) = &mut self.player {
            player.stop();
        }
    }

    fn start_download(&mut self, ctx: &egui::Context, name: String, url: Option<String>) {
        let tx = self.tx.clone();
        let source = Arc::clone(&self.source);
        let ctx = ctx.clone();

        std::thread::spawn(move || match download::fetch_track(&*source, url.as_deref()) {
            Ok(Some(bytes)) => {
                let _ = tx.send(BgResult::DownloadReady(download::track_filename(&name), bytes));
                ctx.request_repaint();
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(track = %name, error = %format!("{:#}", e), "download error");
            }
        });
    }

    fn save_download(&self, filename: &str, bytes: &[u8]) {
        let mut dialog = rfd::FileDialog::new()
            .set_file_name(filename)
            .add_filter("MP3 audio", &["mp3"]);
        if let Some(dir) = &self.config.download.directory {
            dialog = dialog.set_directory(dir);
        }

        let Some(path) = dialog.save_file() else {
            tracing::info!(file = filename, "download cancelled");
            return;
        };
        match download::save_track(&path, bytes) {
            Ok(()) => tracing::info!(path = %path.display(), "track downloaded"),
            Err(e) => tracing::error!(error = %format!("{:#}", e), "download error"),
        }
    }

    fn handle_action(&mut self, ctx: &egui::Context, action: CardAction) {
        match action {
            CardAction::TogglePlayback(id) => self.toggle_playback(ctx, &id),
            CardAction::Download { name, url } => self.start_download(ctx, name, url),
        }
    }

    fn process_bg_results(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                BgResult::SearchDone(ticket, outcome) => {
                    if self.view.finish_search(ticket, outcome) {
                        self.results_ticket = Some(ticket);
                        self.cards = build_cards(self.view.songs());
                        self.fetch_thumbnails(ticket, ctx);
                    }
                }
                BgResult::ThumbnailDone(ticket, index, data) => {
                    let Some(index) = thumbnail_slot(self.results_ticket, ticket, index, self.cards.len())
                    else {
                        continue;
                    };
                    let card = &mut self.cards[index];
                    card.thumbnail = load_texture(ctx, &format!("thumb_{}", card.song.id), &data);
                }
                BgResult::AudioReady(ticket, data) => {
                    let Some(id) = self.audio.accept(ticket, self.view.playing()) else {
                        continue;
                    };
                    if let Some(player) = &mut self.player {
                        if let Err(e) = player.play_bytes(&id, data) {
                            tracing::error!(track = %id, error = %format!("{:#}", e), "playback failed");
                            self.view.on_audio_stopped();
                        }
                    }
                }
                BgResult::AudioFailed(ticket) => {
                    if let Some(id) = self.audio.fail(ticket) {
                        if self.view.is_playing(&id) {
                            self.view.on_audio_stopped();
                        }
                    }
                }
                BgResult::DownloadReady(filename, bytes) => {
                    self.save_download(&filename, &bytes);
                }
            }
        }
    }

    fn poll_player(&mut self, ctx: &egui::Context) {
        let Some(player) = &mut self.player else {
            return;
        };
        if player.is_finished() {
            player.stop();
            self.view.on_audio_stopped();
        }
        if let Some(id) = self.view.playing() {
            if player.is_playing(id) {
                // Keeps the elapsed-time label moving.
                ctx.request_repaint_after(Duration::from_millis(250));
            }
        }
    }
}

impl eframe::App for PlayerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_bg_results(ctx);
        self.poll_player(ctx);

        // Top panel: search box
        egui::TopBottomPanel::top("search_panel").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading("Music Player");
            ui.horizontal(|ui| {
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.view.query)
                        .hint_text("Search for songs...")
                        .desired_width(ui.available_width() - 90.0),
                );
                let enter =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                let clicked = ui
                    .add_enabled(!self.view.is_loading(), egui::Button::new("🔍 Search"))
                    .clicked();
                if enter || clicked {
                    self.start_search(ctx);
                }
                if self.view.is_loading() {
                    ui.spinner();
                }
            });
            if let Some(error) = self.view.error() {
                ui.colored_label(ERROR_COLOR, error);
            }
            ui.add_space(6.0);
        });

        // Central panel: result grid
        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    ui.spacing_mut().item_spacing = egui::vec2(12.0, 12.0);
                    for card in &mut self.cards {
                        let id = card.song.id.as_str();
                        let playing = self.view.is_playing(id);
                        let buffering = self.audio.is_buffering(id);
                        let position = self.player.as_ref().and_then(|p| p.position(id));
                        if let Some(action) = card.show(ui, playing, buffering, position) {
                            actions.push(action);
                        }
                    }
                });
            });
        });

        for action in actions {
            self.handle_action(ctx, action);
        }
    }
}

fn build_cards(songs: &[Song]) -> Vec<ResultCard> {
    songs
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, song)| ResultCard::new(i, song))
        .collect()
}

/// Card index a thumbnail reply belongs to, or `None` when it was fetched for
/// an older result list.
fn thumbnail_slot(
    current: Option<SearchTicket>,
    ticket: SearchTicket,
    index: usize,
    len: usize,
) -> Option<usize> {
    (current == Some(ticket) && index < len).then_some(index)
}

fn load_texture(ctx: &egui::Context, name: &str, data: &[u8]) -> Option<TextureHandle> {
    let img = match image::load_from_memory(data) {
        Ok(img) => img,
        Err(e) => {
            tracing::debug!(texture = name, error = %e, "undecodable image");
            return None;
        }
    };
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.into_raw();
    let color_image = ColorImage::from_rgba_unmultiplied(size, &pixels);
    Some(ctx.load_texture(name, color_image, Default::default()))
}

/// `m:ss`
fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
