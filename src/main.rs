// main.rs — 桌面宿主：菜单、场景面板、热点编辑表单、状态栏与 3D 交互

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

use panotour::gesture::PointerId;
use panotour::renderer::Renderer;
use panotour::{
    HotspotEdit, InteractionMode, LaunchOptions, OrientationState, PanoramaViewer, PlanarPercent, Scene,
    TargetOption, Tour, TourSession, ViewerConfig, ViewerError, ViewerEvent, ViewerProps,
    MAX_HOTSPOTS_PER_SCENE,
};

use glam::DVec2;
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

const APP_TITLE: &str = "Panotour";
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];
// 浏览器滚轮一格约 100 像素
const WHEEL_LINE_PIXELS: f64 = 100.0;
const MAGNIFY_PIXELS: f64 = 400.0;

type Viewer = PanoramaViewer<Renderer>;

/// Pending hotspot form contents.
#[derive(Default)]
struct HotspotForm {
    title: String,
    target: Option<String>,
    description: String,
}

/// Metadata form for an existing hotspot.
struct EditForm {
    hotspot_id: String,
    edit: HotspotEdit,
}

/// Host-side state the UI closure may touch.
struct HostState {
    session: TourSession,
    form: HotspotForm,
    editing: Option<EditForm>,
    show_flat_editor: bool,
    last_error: Option<String>,
    cursor: DVec2,
    is_fullscreen: bool,
}

/// Viewer state copied out before the UI pass borrows the renderer.
struct ViewerSnapshot {
    mode: InteractionMode,
    orientation: OrientationState,
    loading: bool,
    pending: Option<PlanarPercent>,
    controls_visible: bool,
    available_targets: Vec<TargetOption>,
    // 物理像素
    labels: Vec<(String, DVec2)>,
    preview: Option<egui::TextureId>,
}

/// Collected during the UI pass, applied once rendering is done.
enum UiAction {
    OpenImage(PathBuf),
    OpenTour(PathBuf),
    SaveTour(PathBuf),
    SetMode(InteractionMode),
    ToggleFullscreen,
    ResetView,
    SelectScene(String),
    RemoveScene(String),
    SetStartScene(String),
    DeleteHotspot(String),
    EditHotspot(String),
    SaveHotspotEdit,
    PlacePlanar(PlanarPercent),
    ConfirmHotspot { target: String, title: String, description: String },
    CancelHotspot,
    Exit,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = LaunchOptions::from_env();
    let config = ViewerConfig::resolve(&options);
    let session = TourSession::new(initial_tour(&options));

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(APP_TITLE)
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(e) => {
            log::error!("failed to create window: {e}");
            return;
        }
    };

    let renderer = match pollster::block_on(Renderer::new(window.clone(), &config)) {
        Ok(renderer) => renderer,
        Err(e) => {
            log::error!("{e}");
            rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title(APP_TITLE)
                .set_description(&e.to_string())
                .show();
            return;
        }
    };

    let size = window.inner_size();
    let mode = if options.edit {
        InteractionMode::Edit
    } else {
        InteractionMode::View
    };
    let mut viewer = PanoramaViewer::new(
        renderer,
        ViewerProps {
            mode,
            ..Default::default()
        },
        config,
        size.width,
        size.height,
    );

    let mut host = HostState {
        session,
        form: HotspotForm::default(),
        editing: None,
        show_flat_editor: false,
        last_error: None,
        cursor: DVec2::ZERO,
        is_fullscreen: false,
    };
    present_current_scene(&mut viewer, &mut host, &window);

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                if let Some(renderer) = viewer.surface_mut() {
                    let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                    if response.consumed {
                        return;
                    }
                }

                match event {
                    WindowEvent::CloseRequested => {
                        viewer.dispose();
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        viewer.resize(new_size.width, new_size.height);
                    }

                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        viewer.resize(new_inner_size.width, new_inner_size.height);
                    }

                    WindowEvent::Focused(false) => {
                        viewer.cancel_gesture(Instant::now());
                    }

                    // 键盘快捷键
                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            let action = match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => pick_image().map(UiAction::OpenImage),
                                Some(VirtualKeyCode::E) => Some(UiAction::SetMode(match viewer.mode() {
                                    InteractionMode::View => InteractionMode::Edit,
                                    InteractionMode::Edit => InteractionMode::View,
                                })),
                                Some(VirtualKeyCode::R) => Some(UiAction::ResetView),
                                Some(VirtualKeyCode::Escape) => Some(UiAction::CancelHotspot),
                                Some(VirtualKeyCode::F11) => Some(UiAction::ToggleFullscreen),
                                _ => None,
                            };
                            if let Some(action) = action {
                                apply_action(action, &mut viewer, &mut host, &window, control_flow);
                            }
                        }
                    }

                    // 鼠标交互
                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            let now = Instant::now();
                            match state {
                                ElementState::Pressed => viewer.pointer_pressed(PointerId::Mouse, host.cursor, now),
                                ElementState::Released => viewer.pointer_released(PointerId::Mouse, host.cursor, now),
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        host.cursor = DVec2::new(position.x, position.y);
                        viewer.pointer_moved(PointerId::Mouse, host.cursor);
                    }

                    WindowEvent::CursorLeft { .. } => {
                        viewer.pointer_cancelled(PointerId::Mouse, Instant::now());
                    }

                    // 触摸：只跟踪第一个触点
                    WindowEvent::Touch(touch) => {
                        let pointer = PointerId::Touch(touch.id);
                        let position = DVec2::new(touch.location.x, touch.location.y);
                        let now = Instant::now();
                        match touch.phase {
                            TouchPhase::Started => viewer.pointer_pressed(pointer, position, now),
                            TouchPhase::Moved => viewer.pointer_moved(pointer, position),
                            TouchPhase::Ended => viewer.pointer_released(pointer, position, now),
                            TouchPhase::Cancelled => viewer.pointer_cancelled(pointer, now),
                        }
                    }

                    // winit 向上滚为正，浏览器 deltaY 向下为正
                    WindowEvent::MouseWheel { delta, .. } => {
                        let delta_y = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -(y as f64) * WHEEL_LINE_PIXELS,
                            MouseScrollDelta::PixelDelta(pos) => -pos.y,
                        };
                        viewer.wheel(delta_y);
                    }

                    WindowEvent::TouchpadMagnify { delta, .. } => {
                        viewer.wheel(-delta * MAGNIFY_PIXELS);
                    }

                    WindowEvent::DroppedFile(path) => {
                        apply_action(UiAction::OpenImage(path), &mut viewer, &mut host, &window, control_flow);
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                if viewer.is_disposed() {
                    return;
                }
                let now = Instant::now();
                viewer.update(now);
                for event in viewer.drain_events() {
                    handle_viewer_event(event, &mut viewer, &mut host, &window);
                }

                let snapshot = ViewerSnapshot {
                    mode: viewer.mode(),
                    orientation: viewer.orientation(),
                    loading: viewer.is_loading(),
                    pending: viewer.pending_position().map(|p| p.to_planar()),
                    controls_visible: viewer.controls_visible(now),
                    available_targets: viewer.available_targets().to_vec(),
                    labels: viewer
                        .hotspot_screen_positions()
                        .into_iter()
                        .map(|(h, pos)| (h.display_title().to_string(), pos))
                        .collect(),
                    preview: viewer.surface_mut().and_then(|r| r.panorama_preview()),
                };

                // 渲染 UI 和 场景
                let mut actions = Vec::new();
                let render_result = match viewer.surface_mut() {
                    Some(renderer) => renderer.render_with_ui(&window, |ctx| {
                        draw_ui(ctx, &mut host, &snapshot, &mut actions);
                    }),
                    None => Ok(()),
                };

                for action in actions {
                    apply_action(action, &mut viewer, &mut host, &window, control_flow);
                }

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        if let Some(renderer) = viewer.surface_mut() {
                            renderer.reconfigure();
                        }
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("GPU out of memory");
                        viewer.dispose();
                        *control_flow = ControlFlow::Exit;
                    }
                    Err(e) => log::warn!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

fn initial_tour(options: &LaunchOptions) -> Tour {
    let mut tour = match &options.tour {
        Some(path) => match Tour::load(path) {
            Ok(tour) => {
                log::info!("loaded tour {} ({} scenes)", tour.title, tour.scenes.len());
                tour
            }
            Err(e) => {
                log::error!("{e}");
                Tour::new(panotour::tour::new_tour_id(), "Untitled Tour", "")
            }
        },
        None => Tour::new(panotour::tour::new_tour_id(), "Untitled Tour", ""),
    };
    if let Some(image) = &options.image {
        tour.add_scene(Scene::new(scene_title_for(image), image.clone()));
    }
    tour
}

fn scene_title_for(url: &str) -> String {
    std::path::Path::new(url)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Scene".to_string())
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Images", &IMAGE_EXTENSIONS)
        .pick_file()
}

/// Pushes the session's current scene into the viewer. Open hotspot forms
/// belong to the previous scene and are closed.
fn present_current_scene(viewer: &mut Viewer, host: &mut HostState, window: &Window) {
    host.form = HotspotForm::default();
    host.editing = None;
    let session = &host.session;
    viewer.set_available_targets(session.available_targets());
    match session.current_scene() {
        Some(scene) => {
            viewer.set_hotspots(scene.hotspots.clone());
            if viewer.image_url() != scene.image_url {
                viewer.load_panorama(&scene.image_url);
            }
            window.set_title(&format!("{APP_TITLE} - {}", scene.title));
        }
        None => {
            viewer.set_hotspots(Vec::new());
            window.set_title(APP_TITLE);
        }
    }
}

fn switch_scene(scene_id: &str, viewer: &mut Viewer, host: &mut HostState, window: &Window) -> Result<(), ViewerError> {
    host.session.select(scene_id)?;
    viewer.reset_view();
    present_current_scene(viewer, host, window);
    Ok(())
}

fn handle_viewer_event(event: ViewerEvent, viewer: &mut Viewer, host: &mut HostState, window: &Window) {
    match event {
        ViewerEvent::HotspotPlacementRequested { anchor } => {
            log::debug!("placement requested at {anchor:?}");
            host.form = HotspotForm {
                target: viewer.available_targets().first().map(|t| t.id.clone()),
                ..Default::default()
            };
        }
        ViewerEvent::HotspotCreated(hotspot) => {
            let Some(scene) = host.session.current_scene_mut() else {
                return;
            };
            if let Err(e) = scene.add_hotspot(hotspot) {
                host.last_error = Some(e.to_string());
                viewer.set_hotspots(scene.hotspots.clone());
            }
        }
        ViewerEvent::HotspotDeleted(id) => {
            if let Some(scene) = host.session.current_scene_mut() {
                scene.remove_hotspot(&id);
            }
        }
        ViewerEvent::Navigate(target) => match host.session.navigate(&target).map(|_| ()) {
            Ok(()) => {
                viewer.reset_view();
                present_current_scene(viewer, host, window);
            }
            Err(e) => host.last_error = Some(e.to_string()),
        },
        ViewerEvent::LoadingStateChanged(loading) => {
            log::debug!("loading: {loading}");
        }
        ViewerEvent::Error(e) => {
            if e.is_user_facing() {
                host.last_error = Some(e.to_string());
            } else {
                log::debug!("{e}");
            }
        }
    }
}

fn apply_action(
    action: UiAction,
    viewer: &mut Viewer,
    host: &mut HostState,
    window: &Window,
    control_flow: &mut ControlFlow,
) {
    let result: Result<(), ViewerError> = match action {
        UiAction::OpenImage(path) => {
            let url = path.to_string_lossy().into_owned();
            let id = host
                .session
                .tour_mut()
                .add_scene(Scene::new(scene_title_for(&url), url))
                .id
                .clone();
            switch_scene(&id, viewer, host, window)
        }
        UiAction::OpenTour(path) => Tour::load(&path).map(|tour| {
            host.session = TourSession::new(tour);
            viewer.reset_view();
            present_current_scene(viewer, host, window);
        }),
        UiAction::SaveTour(path) => host.session.tour().save(&path).map(|_| {
            log::info!("tour saved to {}", path.display());
        }),
        UiAction::SetMode(mode) => {
            viewer.set_mode(mode);
            Ok(())
        }
        UiAction::ToggleFullscreen => {
            host.is_fullscreen = !host.is_fullscreen;
            if host.is_fullscreen {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            } else {
                window.set_fullscreen(None);
            }
            Ok(())
        }
        UiAction::ResetView => {
            viewer.reset_view();
            Ok(())
        }
        UiAction::SelectScene(id) => switch_scene(&id, viewer, host, window),
        UiAction::RemoveScene(id) => {
            if let Some((removed, dangling)) = host.session.tour_mut().remove_scene(&id) {
                if !dangling.is_empty() {
                    host.last_error = Some(format!(
                        "{} hotspot(s) still point at removed scene \"{}\"",
                        dangling.len(),
                        removed.title
                    ));
                }
            }
            host.session.sync();
            present_current_scene(viewer, host, window);
            Ok(())
        }
        UiAction::SetStartScene(id) => host.session.tour_mut().set_starting_scene(&id),
        UiAction::DeleteHotspot(id) => {
            viewer.delete_hotspot(&id);
            Ok(())
        }
        UiAction::EditHotspot(id) => {
            host.editing = host
                .session
                .current_scene()
                .and_then(|scene| scene.hotspots.iter().find(|h| h.id == id))
                .map(|hotspot| EditForm {
                    hotspot_id: id.clone(),
                    edit: HotspotEdit::from_hotspot(hotspot),
                });
            Ok(())
        }
        UiAction::SaveHotspotEdit => match host.editing.take() {
            Some(form) => match host.session.edit_hotspot(&form.hotspot_id, &form.edit) {
                Ok(scene) => {
                    viewer.set_hotspots(scene.hotspots.clone());
                    Ok(())
                }
                Err(e) => {
                    host.editing = Some(form);
                    Err(e)
                }
            },
            None => Ok(()),
        },
        UiAction::PlacePlanar(point) => {
            viewer.place_planar(point);
            Ok(())
        }
        UiAction::ConfirmHotspot {
            target,
            title,
            description,
        } => viewer
            .confirm_hotspot(&target, Some(title), Some(description))
            .map(|_| host.form = HotspotForm::default()),
        UiAction::CancelHotspot => {
            viewer.cancel_hotspot();
            host.form = HotspotForm::default();
            Ok(())
        }
        UiAction::Exit => {
            viewer.dispose();
            *control_flow = ControlFlow::Exit;
            Ok(())
        }
    };

    if let Err(e) = result {
        log::warn!("{e}");
        host.last_error = Some(e.to_string());
    }
}

fn draw_ui(ctx: &egui::Context, host: &mut HostState, view: &ViewerSnapshot, actions: &mut Vec<UiAction>) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            // File
            ui.menu_button("File", |ui| {
                if ui.button("Open Image...").clicked() {
                    ui.close_menu();
                    if let Some(path) = pick_image() {
                        actions.push(UiAction::OpenImage(path));
                    }
                }
                if ui.button("Open Tour...").clicked() {
                    ui.close_menu();
                    if let Some(path) = rfd::FileDialog::new().add_filter("Tour", &["json"]).pick_file() {
                        actions.push(UiAction::OpenTour(path));
                    }
                }
                if ui.button("Save Tour...").clicked() {
                    ui.close_menu();
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Tour", &["json"])
                        .set_file_name("tour.json")
                        .save_file()
                    {
                        actions.push(UiAction::SaveTour(path));
                    }
                }
                ui.separator();
                if ui.button("Exit").clicked() {
                    actions.push(UiAction::Exit);
                }
            });

            // View
            ui.menu_button("View", |ui| {
                if ui.button("Reset View").clicked() {
                    actions.push(UiAction::ResetView);
                    ui.close_menu();
                }
                if ui
                    .button(if host.is_fullscreen { "Exit Fullscreen" } else { "Fullscreen" })
                    .clicked()
                {
                    actions.push(UiAction::ToggleFullscreen);
                    ui.close_menu();
                }
                if ui.checkbox(&mut host.show_flat_editor, "Flat Editor").clicked() {
                    ui.close_menu();
                }
                ui.separator();
                let mut mode = view.mode;
                ui.radio_value(&mut mode, InteractionMode::View, "View Mode");
                ui.radio_value(&mut mode, InteractionMode::Edit, "Edit Mode");
                if mode != view.mode {
                    actions.push(UiAction::SetMode(mode));
                    ui.close_menu();
                }
            });
        });
    });

    egui::SidePanel::left("scenes").default_width(220.0).show(ctx, |ui| {
        let tour = host.session.tour();
        let current = host.session.current_scene_id();
        let start = tour.starting_scene_id.as_str();

        ui.heading("Scenes");
        if tour.scenes.is_empty() {
            ui.label("Open an image to add the first scene.");
        }
        for scene in &tour.scenes {
            ui.horizontal(|ui| {
                let label = if scene.id == start {
                    format!("★ {}", scene.title)
                } else {
                    scene.title.clone()
                };
                if ui.selectable_label(scene.id == current, label).clicked() && scene.id != current {
                    actions.push(UiAction::SelectScene(scene.id.clone()));
                }
                if view.mode == InteractionMode::Edit {
                    if scene.id != start && ui.small_button("Start").clicked() {
                        actions.push(UiAction::SetStartScene(scene.id.clone()));
                    }
                    if ui.small_button("Remove").clicked() {
                        actions.push(UiAction::RemoveScene(scene.id.clone()));
                    }
                }
            });
        }

        if let Some(scene) = host.session.current_scene() {
            ui.separator();
            ui.heading(format!("Hotspots {}/{}", scene.hotspots.len(), MAX_HOTSPOTS_PER_SCENE));
            if scene.is_full() && view.mode == InteractionMode::Edit {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    format!("Maximum {MAX_HOTSPOTS_PER_SCENE} hotspots per scene"),
                );
            }
            for hotspot in &scene.hotspots {
                let target = tour
                    .scene(&hotspot.target_panorama_id)
                    .map(|s| s.title.as_str())
                    .unwrap_or("(missing scene)");
                ui.horizontal(|ui| {
                    let label = ui.label(format!("{} → {}", hotspot.display_title(), target));
                    if let Some(description) = &hotspot.description {
                        label.on_hover_text(description.as_str());
                    }
                    if view.mode == InteractionMode::Edit {
                        if ui
                            .add_enabled(view.pending.is_none(), egui::Button::new("Edit").small())
                            .clicked()
                        {
                            actions.push(UiAction::EditHotspot(hotspot.id.clone()));
                        }
                        if ui.small_button("Delete").clicked() {
                            actions.push(UiAction::DeleteHotspot(hotspot.id.clone()));
                        }
                    }
                });
            }
        }
    });

    if view.pending.is_some() {
        egui::Window::new("New Hotspot")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Title");
                    ui.text_edit_singleline(&mut host.form.title);
                });

                if view.available_targets.is_empty() {
                    ui.label("Add another scene to link to.");
                } else {
                    let selected = host
                        .form
                        .target
                        .as_deref()
                        .and_then(|id| view.available_targets.iter().find(|t| t.id == id))
                        .map(|t| t.title.clone())
                        .unwrap_or_else(|| "Choose a scene".to_string());
                    egui::ComboBox::from_label("Target scene")
                        .selected_text(selected)
                        .show_ui(ui, |ui| {
                            for target in &view.available_targets {
                                ui.selectable_value(&mut host.form.target, Some(target.id.clone()), target.title.as_str());
                            }
                        });
                }

                ui.label("Description");
                ui.text_edit_multiline(&mut host.form.description);

                ui.horizontal(|ui| {
                    let confirm = ui.add_enabled(host.form.target.is_some(), egui::Button::new("Add Hotspot"));
                    if confirm.clicked() {
                        if let Some(target) = host.form.target.clone() {
                            actions.push(UiAction::ConfirmHotspot {
                                target,
                                title: host.form.title.clone(),
                                description: host.form.description.clone(),
                            });
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        actions.push(UiAction::CancelHotspot);
                    }
                });
            });
    }

    let mut close_edit = false;
    if let Some(form) = host.editing.as_mut() {
        egui::Window::new("Edit Hotspot")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label("Title");
                    ui.text_edit_singleline(&mut form.edit.title);
                });
                let selected = view
                    .available_targets
                    .iter()
                    .find(|t| t.id == form.edit.target_panorama_id)
                    .map(|t| t.title.clone())
                    .unwrap_or_else(|| "(missing scene)".to_string());
                egui::ComboBox::from_label("Target scene")
                    .selected_text(selected)
                    .show_ui(ui, |ui| {
                        for target in &view.available_targets {
                            ui.selectable_value(&mut form.edit.target_panorama_id, target.id.clone(), target.title.as_str());
                        }
                    });
                ui.label("Description");
                ui.text_edit_multiline(&mut form.edit.description);

                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        actions.push(UiAction::SaveHotspotEdit);
                    }
                    if ui.button("Cancel").clicked() {
                        close_edit = true;
                    }
                });
            });
    }
    if close_edit {
        host.editing = None;
    }

    if host.show_flat_editor {
        draw_flat_editor(ctx, host, view, actions);
    }

    // 热点标题
    if view.mode == InteractionMode::View && !view.labels.is_empty() {
        let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::Background, egui::Id::new("hotspot_labels")));
        let pixels_per_point = ctx.pixels_per_point();
        for (title, pos) in &view.labels {
            let at = egui::pos2(pos.x as f32 / pixels_per_point, pos.y as f32 / pixels_per_point);
            painter.text(
                at - egui::vec2(0.0, 18.0),
                egui::Align2::CENTER_BOTTOM,
                title,
                egui::FontId::proportional(14.0),
                egui::Color32::WHITE,
            );
        }
    }

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if view.loading {
                ui.label(egui::RichText::new("Loading panorama...").color(egui::Color32::YELLOW));
                ui.label("|");
            }
            ui.label(match view.mode {
                InteractionMode::View => "View",
                InteractionMode::Edit => "Edit",
            });
            ui.label("|");
            ui.label(format!("FOV: {:.1}°", view.orientation.fov));
            ui.label("|");
            ui.label(format!("Azimuth: {:.1}°", view.orientation.phi.to_degrees()));
            ui.label("|");
            ui.label(format!("Elevation: {:.1}°", view.orientation.theta.to_degrees()));

            if let Some(error) = host.last_error.clone() {
                ui.label("|");
                ui.colored_label(egui::Color32::LIGHT_RED, error);
                if ui.small_button("✕").clicked() {
                    host.last_error = None;
                }
            }
        });
    });

    // 拖拽时隐藏操作提示
    if view.controls_visible {
        let hint = match view.mode {
            InteractionMode::View => "Drag to look around, scroll to zoom, click a marker to move on",
            InteractionMode::Edit => "Click the panorama to place a hotspot",
        };
        egui::Area::new("controls_hint")
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -40.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.label(hint);
                });
            });
    }
}

/// Simplified 2D authoring: click the flat equirectangular image to place a
/// hotspot by percentage.
fn draw_flat_editor(ctx: &egui::Context, host: &mut HostState, view: &ViewerSnapshot, actions: &mut Vec<UiAction>) {
    let mut open = host.show_flat_editor;
    egui::Window::new("Flat Editor")
        .open(&mut open)
        .default_width(640.0)
        .show(ctx, |ui| {
            let width = ui.available_width().max(320.0);
            let (rect, response) = ui.allocate_exact_size(egui::vec2(width, width / 2.0), egui::Sense::click());
            let painter = ui.painter_at(rect);

            match view.preview {
                Some(texture) => painter.image(
                    texture,
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                ),
                None => {
                    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(60));
                    let grid = egui::Stroke::new(1.0, egui::Color32::from_gray(90));
                    for i in 1..8 {
                        let x = rect.left() + rect.width() * i as f32 / 8.0;
                        painter.line_segment([egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())], grid);
                    }
                    for i in 1..4 {
                        let y = rect.top() + rect.height() * i as f32 / 4.0;
                        painter.line_segment([egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)], grid);
                    }
                }
            }

            let to_screen = |p: PlanarPercent| {
                egui::pos2(
                    rect.left() + rect.width() * (p.x / 100.0) as f32,
                    rect.top() + rect.height() * (p.y / 100.0) as f32,
                )
            };
            if let Some(scene) = host.session.current_scene() {
                for hotspot in &scene.hotspots {
                    let at = to_screen(hotspot.position.to_planar());
                    painter.circle_filled(at, 6.0, egui::Color32::from_rgb(0, 255, 255));
                    painter.text(
                        at - egui::vec2(0.0, 8.0),
                        egui::Align2::CENTER_BOTTOM,
                        hotspot.display_title(),
                        egui::FontId::proportional(12.0),
                        egui::Color32::WHITE,
                    );
                }
            }
            if let Some(pending) = view.pending {
                painter.circle_stroke(to_screen(pending), 8.0, egui::Stroke::new(2.0, egui::Color32::YELLOW));
            }

            let to_percent = |pos: egui::Pos2| PlanarPercent {
                x: ((pos.x - rect.left()) / rect.width() * 100.0) as f64,
                y: ((pos.y - rect.top()) / rect.height() * 100.0) as f64,
            };
            if response.clicked() && view.mode == InteractionMode::Edit {
                if let Some(pos) = response.interact_pointer_pos() {
                    actions.push(UiAction::PlacePlanar(to_percent(pos)));
                }
            }

            match response.hover_pos().map(to_percent) {
                Some(p) => ui.label(format!("x: {:.1}%  y: {:.1}%", p.x, p.y)),
                None if view.mode == InteractionMode::Edit => ui.label("Click the image to place a hotspot"),
                None => ui.label("Switch to Edit Mode to place hotspots"),
            };
        });
    host.show_flat_editor = open;
}
