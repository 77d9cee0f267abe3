/// Issues shown per page.
pub const PAGE_SIZE: usize = 10;

pub fn page_count(total_count: u64) -> u32 {
    let pages = total_count.div_ceil(PAGE_SIZE as u64);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Clamps a requested page index into `[1, page_count]`.
///
/// An empty collection still has a first (empty) page.
pub fn clamp_page(requested: u32, total_count: u64) -> u32 {
    requested.clamp(1, page_count(total_count).max(1))
}
