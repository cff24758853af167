//! 円形アーティファクトの補間
//!
//! マスク領域を外周から1画素幅ずつ内側へ埋める。各画素は既知画素の
//! 距離重み付き平均（重み 1/d²）で決まる。

use image::{Rgb, RgbImage};

/// 円形マスク（true = 補間対象）
pub fn circle_mask(width: u32, height: u32, center: [i32; 2], radius: u32) -> Vec<bool> {
    let r2 = (radius as i64) * (radius as i64);
    let (cx, cy) = (center[0] as i64, center[1] as i64);

    (0..height as i64)
        .flat_map(|y| (0..width as i64).map(move |x| (x, y)))
        .map(|(x, y)| (x - cx).pow(2) + (y - cy).pow(2) <= r2)
        .collect()
}

/// マスク領域を周囲の画素から補間
///
/// # Arguments
/// * `image` - 入力画像
/// * `mask` - 幅×高さのマスク（行優先）
/// * `radius` - 参照する近傍の半径（正方窓）
pub fn inpaint(image: &RgbImage, mask: &[bool], radius: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut output = image.clone();
    let mut unknown = mask.to_vec();
    let r = radius.max(1) as i64;

    let mut pending: Vec<(u32, u32)> = unknown
        .iter()
        .enumerate()
        .filter(|(_, m)| **m)
        .map(|(i, _)| ((i % width as usize) as u32, (i / width as usize) as u32))
        .collect();

    while !pending.is_empty() {
        // 既知画素に接している未知画素 = 今回埋める輪
        let (ring, rest): (Vec<(u32, u32)>, Vec<(u32, u32)>) = pending
            .iter()
            .partition(|&&(x, y)| has_known_neighbor(&unknown, width, height, x, y));

        if ring.is_empty() {
            // 既知画素が1つもない（画像全体がマスク）
            break;
        }

        let filled: Vec<((u32, u32), Rgb<u8>)> = ring
            .iter()
            .filter_map(|&(x, y)| {
                weighted_mean(&output, &unknown, x, y, r).map(|px| ((x, y), px))
            })
            .collect();

        for ((x, y), px) in filled {
            output.put_pixel(x, y, px);
            unknown[(y * width + x) as usize] = false;
        }

        pending = rest;
    }

    output
}

fn has_known_neighbor(unknown: &[bool], width: u32, height: u32, x: u32, y: u32) -> bool {
    for dy in -1i64..=1 {
        for dx in -1i64..=1 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            if !unknown[(ny as u32 * width + nx as u32) as usize] {
                return true;
            }
        }
    }
    false
}

fn weighted_mean(image: &RgbImage, unknown: &[bool], x: u32, y: u32, r: i64) -> Option<Rgb<u8>> {
    let (width, height) = image.dimensions();
    let mut acc = [0f64; 3];
    let mut weight_sum = 0f64;

    for dy in -r..=r {
        for dx in -r..=r {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                continue;
            }
            if unknown[(ny as u32 * width + nx as u32) as usize] {
                continue;
            }

            let weight = 1.0 / (dx * dx + dy * dy) as f64;
            let px = image.get_pixel(nx as u32, ny as u32);
            for c in 0..3 {
                acc[c] += weight * px[c] as f64;
            }
            weight_sum += weight;
        }
    }

    if weight_sum == 0.0 {
        return None;
    }

    Some(Rgb(acc.map(|v| (v / weight_sum).round().clamp(0.0, 255.0) as u8)))
}
