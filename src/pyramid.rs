use image::DynamicImage;

/// Single-channel f32 luminance frame, intensities in `[0, 1]`.
///
/// Both core operations reduce their input to this representation before
/// doing any numeric work. Row-major, `data.len() == width * height`.
#[derive(Debug, Clone)]
pub struct GrayFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl GrayFrame {
    pub fn from_dynamic(img: &DynamicImage) -> GrayFrame {
        let luma = img.to_luma32f();
        let (w, h) = luma.dimensions();
        GrayFrame {
            width: w as usize,
            height: h as usize,
            data: luma.into_raw(),
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<f32>) -> GrayFrame {
        assert_eq!(data.len(), width * height);
        GrayFrame {
            width,
            height,
            data,
        }
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Pixel access with clamp-to-edge border handling.
    pub fn at(&self, x: isize, y: isize) -> f32 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.data[y * self.width + x]
    }

    pub fn bilinear(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let x0 = x0 as isize;
        let y0 = y0 as isize;

        let v00 = self.at(x0, y0);
        let v10 = self.at(x0 + 1, y0);
        let v01 = self.at(x0, y0 + 1);
        let v11 = self.at(x0 + 1, y0 + 1);
        v00 * (1.0 - fx) * (1.0 - fy)
            + v10 * fx * (1.0 - fy)
            + v01 * (1.0 - fx) * fy
            + v11 * fx * fy
    }

    /// Central-difference gradient at a sub-pixel location.
    pub fn gradient(&self, x: f32, y: f32) -> (f32, f32) {
        let ix = (self.bilinear(x + 1.0, y) - self.bilinear(x - 1.0, y)) * 0.5;
        let iy = (self.bilinear(x, y + 1.0) - self.bilinear(x, y - 1.0)) * 0.5;
        (ix, iy)
    }

    /// Downsample by two with 2x2 box averaging.
    pub fn half(&self) -> GrayFrame {
        let w = (self.width / 2).max(1);
        let h = (self.height / 2).max(1);
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                let sx = (x * 2) as isize;
                let sy = (y * 2) as isize;
                let v = (self.at(sx, sy)
                    + self.at(sx + 1, sy)
                    + self.at(sx, sy + 1)
                    + self.at(sx + 1, sy + 1))
                    * 0.25;
                data.push(v);
            }
        }
        GrayFrame {
            width: w,
            height: h,
            data,
        }
    }
}

/// Builds `levels + 1` pyramid levels, level 0 being the input frame.
///
/// Stops early if a level would shrink below `min_size` in either dimension.
pub fn build_pyramid(frame: &GrayFrame, levels: usize, min_size: usize) -> Vec<GrayFrame> {
    let mut pyramid = vec![frame.clone()];
    for _ in 0..levels {
        let last = pyramid.last().unwrap();
        if last.width / 2 < min_size || last.height / 2 < min_size {
            break;
        }
        let next = last.half();
        pyramid.push(next);
    }
    pyramid
}
