//! Row and column naming
//!
//! Row names are the on-disk contract of the store and must stay bit-exact:
//!
//! ```text
//! unsharded:  :ts:o:2147483646:
//! sharded:    07:ts:t:2147483646:,0=1,1=0,
//!             ^^ ^^ ^ ^^^^^^^^^^ ^^^^^^^^^
//!          shard ns type tile key subkey
//! ```
//!
//! Tile keys count down from `i32::MAX` so that the newest tile sorts first
//! in the store's lexicographic row order.

use std::fmt;

/// Namespace segment of every row name
pub const NAMESPACE: &str = "ts";

/// Row type of the per-tile param-set dictionary
pub const TYPE_OPS: &str = "o";
/// Row type of trace digests
pub const TYPE_TRACE: &str = "t";
/// Row type of trace options
pub const TYPE_OPTIONS: &str = "p";

/// Family holding the param-set dictionary
pub const FAMILY_OPS: &str = "O";
/// Family holding digests, one column per commit offset
pub const FAMILY_TRACE: &str = "T";
/// Family holding trace options
pub const FAMILY_OPTIONS: &str = "P";

/// Content hash column of the dictionary row
pub const COLUMN_HASH: &str = "H";
/// Serialized dictionary column
pub const COLUMN_OPS: &str = "OPS";
/// Options column
pub const COLUMN_OPTIONS: &str = "P";

/// Commits per tile unless configured otherwise
pub const DEFAULT_TILE_SIZE: usize = 256;
/// Shards per tile unless configured otherwise
pub const DEFAULT_SHARDS: u32 = 32;

/// Storage key of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileKey(i32);

impl TileKey {
    /// Key returned for tile indices that cannot exist
    pub const BAD: TileKey = TileKey(-1);

    /// Key of the tile with the given index, oldest tile being 0
    pub fn from_index(tile_index: i64) -> TileKey {
        if tile_index < 0 || tile_index > i64::from(i32::MAX) {
            return TileKey::BAD;
        }
        // In range, so the subtraction cannot leave i32.
        TileKey(i32::MAX - tile_index as i32)
    }

    /// Inverse of [`from_index`](Self::from_index), `None` for [`TileKey::BAD`]
    pub fn to_index(self) -> Option<usize> {
        if self.0 < 0 {
            return None;
        }
        Some((i32::MAX - self.0) as usize)
    }

    /// Raw key
    pub fn raw(self) -> i32 {
        self.0
    }

    /// The next older tile, `None` past the first tile
    pub fn prev(self) -> Option<TileKey> {
        match self.to_index()? {
            0 => None,
            i => Some(TileKey::from_index(i as i64 - 1)),
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

/// Tile key and offset within the tile of a global commit index
pub fn get_tile_key(repo_index: usize, tile_size: usize) -> (TileKey, usize) {
    let tile_index = repo_index / tile_size;
    (TileKey::from_index(tile_index as i64), repo_index % tile_size)
}

/// Name of a row that exists once per tile
pub fn unsharded_row_name(typ: &str, tile_key: TileKey) -> String {
    format!(":{}:{}:{}:", NAMESPACE, typ, tile_key)
}

/// Name of a row that lives in a shard
pub fn sharded_row_name(shard: u32, typ: &str, tile_key: TileKey, subkey: &str) -> String {
    format!("{:02}:{}:{}:{}:{}", shard, NAMESPACE, typ, tile_key, subkey)
}

/// Prefix shared by every row of one type in one shard of a tile
pub fn shard_prefix(shard: u32, typ: &str, tile_key: TileKey) -> String {
    sharded_row_name(shard, typ, tile_key, "")
}

/// The subkey of a sharded row name
///
/// Everything after the fifth colon; subkeys may contain further colons.
pub fn extract_subkey(row_name: &str) -> Option<&str> {
    row_name.splitn(5, ':').nth(4)
}

/// Shard a subkey lives in
pub fn calc_shard(subkey: &str, shards: u32) -> u32 {
    crc32fast::hash(subkey.as_bytes()) % shards
}

/// Sharded row name with the shard derived from the subkey
pub fn calc_sharded_row_name(typ: &str, tile_key: TileKey, subkey: &str, shards: u32) -> String {
    sharded_row_name(calc_shard(subkey, shards), typ, tile_key, subkey)
}

/// Digest column of a commit offset
pub fn column_for_offset(offset: usize) -> String {
    format!("{:03}", offset)
}

/// Inverse of [`column_for_offset`]
pub fn offset_from_column(column: &str) -> Option<usize> {
    column.parse().ok()
}
