//! AppKit surface host.
//!
//! Each surface gets a layer-backed `NSView` child of the host window's
//! content view. The external renderer attaches to that view's layer; this
//! module only manages geometry, scale, and first-responder status.
//!
//! AppKit is main-thread only, so every host method checks for the main
//! thread and fails loudly off it. View pointers are stored as integers;
//! retains are balanced in `destroy_surface`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use objc2::msg_send;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2_app_kit::NSView;
use objc2_foundation::{MainThreadMarker, NSPoint, NSRect, NSSize};
use parking_lot::Mutex;
use raw_window_handle::RawWindowHandle;

use harbor_backend::FrameRect;

use crate::bridge::{SurfaceError, SurfaceHandle, SurfaceHost, SurfaceOptions};

pub struct AppKitSurfaceHost {
    /// The window's content NSView, as a raw pointer value.
    parent_view: usize,
    /// Surface handle -> retained child NSView pointer.
    views: Mutex<HashMap<u64, usize>>,
    next_handle: AtomicU64,
}

impl AppKitSurfaceHost {
    /// Build a host rooted at the NSView behind `handle`.
    pub fn from_window_handle(handle: RawWindowHandle) -> Result<Self, SurfaceError> {
        let ns_view = match handle {
            RawWindowHandle::AppKit(appkit) => appkit.ns_view.as_ptr(),
            _ => {
                return Err(SurfaceError::Host(
                    "not an AppKit window handle".to_string(),
                ));
            }
        };
        Ok(Self {
            parent_view: ns_view as usize,
            views: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    fn main_thread() -> Result<MainThreadMarker, SurfaceError> {
        MainThreadMarker::new()
            .ok_or_else(|| SurfaceError::Host("AppKit call off the main thread".to_string()))
    }

    fn view_ptr(&self, handle: SurfaceHandle) -> Result<*mut AnyObject, SurfaceError> {
        self.views
            .lock()
            .get(&handle.0)
            .map(|&ptr| ptr as *mut AnyObject)
            .ok_or_else(|| SurfaceError::Host(format!("no view for surface {}", handle.0)))
    }

    /// Convert a top-left-origin frame into AppKit's bottom-left space.
    fn flipped(&self, frame: FrameRect) -> NSRect {
        // SAFETY: parent view outlives the host; bounds is a plain getter.
        let parent_bounds: NSRect =
            unsafe { msg_send![self.parent_view as *mut AnyObject, bounds] };
        NSRect::new(
            NSPoint::new(frame.x, parent_bounds.size.height - frame.y - frame.h),
            NSSize::new(frame.w.max(1.0), frame.h.max(1.0)),
        )
    }
}

impl SurfaceHost for AppKitSurfaceHost {
    fn init_runtime(&self) -> Result<(), SurfaceError> {
        Self::main_thread()?;
        if self.parent_view == 0 {
            return Err(SurfaceError::RuntimeInit("null parent view".to_string()));
        }
        log::info!("AppKit surface host ready");
        Ok(())
    }

    fn create_surface(&self, opts: &SurfaceOptions) -> Result<SurfaceHandle, SurfaceError> {
        let mtm = Self::main_thread()?;

        let ns_rect = self.flipped(opts.frame);
        // SAFETY: main thread, parent view valid. The retain from init is
        // held raw in the handle map and balanced in destroy_surface.
        let view: Retained<NSView> = unsafe {
            let view = NSView::initWithFrame(mtm.alloc::<NSView>(), ns_rect);
            let _: () = msg_send![&*view, setWantsLayer: true];
            let _: () = msg_send![self.parent_view as *mut AnyObject, addSubview: &*view];
            view
        };

        // The layer may still be nil before the view joins a window.
        if let Some(layer) = view.layer() {
            layer.setContentsScale(opts.content_scale);
        }

        let handle = SurfaceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.views
            .lock()
            .insert(handle.0, Retained::into_raw(view) as usize);
        log::debug!(
            "{}: created NSView surface {} at {:?}",
            opts.terminal_id,
            handle.0,
            opts.frame
        );
        Ok(handle)
    }

    fn set_frame(&self, handle: SurfaceHandle, frame: FrameRect) -> Result<(), SurfaceError> {
        Self::main_thread()?;
        let view = self.view_ptr(handle)?;
        let ns_rect = self.flipped(frame);
        // SAFETY: view retained by the handle map.
        unsafe {
            let _: () = msg_send![view, setFrame: ns_rect];
        }
        Ok(())
    }

    fn set_content_scale(&self, handle: SurfaceHandle, scale: f64) -> Result<(), SurfaceError> {
        Self::main_thread()?;
        let ptr = self.view_ptr(handle)?;
        // SAFETY: view retained by the handle map.
        let view = unsafe { &*(ptr as *const NSView) };
        if let Some(layer) = view.layer() {
            layer.setContentsScale(scale);
        }
        Ok(())
    }

    fn set_focus(&self, handle: SurfaceHandle, focused: bool) -> Result<(), SurfaceError> {
        Self::main_thread()?;
        let ptr = self.view_ptr(handle)?;
        if !focused {
            return Ok(());
        }
        // SAFETY: view retained by the handle map.
        let view = unsafe { &*(ptr as *const NSView) };
        // Window is nil until the view is attached; nothing to focus then.
        if let Some(window) = view.window() {
            window.makeFirstResponder(Some(view));
        }
        Ok(())
    }

    fn destroy_surface(&self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
        Self::main_thread()?;
        let Some(ptr) = self.views.lock().remove(&handle.0) else {
            return Ok(());
        };
        // SAFETY: ptr came from Retained::into_raw at creation; reclaiming
        // it here balances that retain once removeFromSuperview has dropped
        // the superview's reference.
        unsafe {
            let view = Retained::from_raw(ptr as *mut NSView)
                .ok_or_else(|| SurfaceError::Host("surface view pointer was null".to_string()))?;
            let _: () = msg_send![&*view, removeFromSuperview];
        }
        Ok(())
    }
}
