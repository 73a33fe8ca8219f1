//! Resolution heuristic deciding whether an image suits the display.
//!
//! Images much smaller than the target are dropped, clearly wider ones are
//! kept, and everything in between is judged on total area and aspect ratio
//! so that a slideshow does not end up with letterboxed or upscaled images.

use tracing::debug;

use crate::models::Resolution;

/// Tolerance, in pixels, used by every rule of the heuristic.
pub const ACCEPTABLE_DIFFERENCE: u32 = 90;

/// Decide whether an image of `image` dimensions looks good on `target`.
pub fn keep_image(title: &str, image: Resolution, target: Resolution) -> bool {
    let d = u64::from(ACCEPTABLE_DIFFERENCE);
    let (w, h) = (u64::from(image.width), u64::from(image.height));
    let (tw, th) = (u64::from(target.width), u64::from(target.height));

    if tw > w + 4 * d {
        debug!("{:?} Rejecting: width ({}) < target ({})", title, w, tw);
        return false;
    }
    if th > h + 4 * d {
        debug!("{:?} Rejecting: height ({}) < target ({})", title, h, th);
        return false;
    }
    if w >= tw {
        debug!("{:?} Keeping: width ({}) > target ({})", title, w, tw);
        return true;
    }

    // Compare portraits in landscape orientation.
    let (image, target) = if image.is_portrait() {
        let flipped = image.flipped();
        debug!("{:?} Portrait image -> ({})", title, flipped);
        (flipped, target.flipped())
    } else {
        (image, target)
    };

    if target.area() < image.area() + d * d {
        debug!(
            "{:?} Rejecting: resolution ({} = {}) > target ({} = {})",
            title,
            image,
            image.area(),
            target,
            target.area()
        );
        return false;
    }

    if target.aspect_ratio() - image.aspect_ratio() > d as f64 / 200.0 {
        debug!(
            "{:?} Rejecting: aspect ratio ({} = {:.3}) > target ({} = {:.3})",
            title,
            image,
            image.aspect_ratio(),
            target,
            target.aspect_ratio()
        );
        return false;
    }

    debug!("{:?} Keeping: seems fine ({})", title, image);
    true
}
