//! Row-addressed 2D sample buffers with a movable focus window.
//!
//! An [`Array2d`] owns (or borrows) a fixed reservation of
//! `reserved_width × reserved_height` samples. A focus window inside that
//! reservation defines the logical `(0, 0)` and the active width/height.
//! Moving the focus never touches the row storage; every access goes through
//! [`Array2d::address`], which maps an active `(row, col)` to a storage block
//! and byte offset.
//!
//! Row storage comes in three regimes, see [`RowOwnership`]. Storage blocks
//! are reference counted, so an array that borrows rows from another keeps
//! those rows alive for as long as it exists.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::data_type::DataType;
use crate::error::Array2dError;
use crate::rect::Rectangle;

/// A shared, lockable byte allocation.
#[derive(Clone)]
pub struct Block(Arc<RwLock<Vec<u8>>>);

impl Block {
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Zeroed block of `len` bytes, or `None` when the allocation fails.
    pub fn try_zeroed(len: usize) -> Option<Self> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(len).ok()?;
        bytes.resize(len, 0);
        Some(Self::from_vec(bytes))
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(Arc::new(RwLock::new(bytes)))
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity comparison of the underlying allocation.
    pub fn ptr_eq(a: &Block, b: &Block) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.0.write()
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.read().clone()
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block").field("len", &self.len()).finish()
    }
}

/// Start of a row: a storage block plus a byte offset into it.
///
/// Two `RowRef`s are equal only when they point at the same byte of the same
/// allocation.
#[derive(Debug, Clone)]
pub struct RowRef {
    block: Block,
    offset: usize,
}

impl RowRef {
    pub fn new(block: Block, offset: usize) -> Self {
        Self { block, offset }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn copy_bytes(&self, len: usize) -> Result<Vec<u8>, Array2dError> {
        let bytes = self.block.read();
        let end = self.offset + len;
        if end > bytes.len() {
            return Err(Array2dError::BufferTooSmall {
                expected: end,
                actual: bytes.len(),
            });
        }
        Ok(bytes[self.offset..end].to_vec())
    }
}

impl PartialEq for RowRef {
    fn eq(&self, other: &Self) -> bool {
        Block::ptr_eq(&self.block, &other.block) && self.offset == other.offset
    }
}

impl Eq for RowRef {}

/// Who releases the rows of an [`Array2d`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOwnership {
    /// Rows point into storage owned elsewhere.
    Borrowed,
    /// One allocation, rows at a fixed stride.
    OwnedBlock,
    /// One allocation per row.
    OwnedRows,
}

/// How [`Array2d::set_rows`] takes over a row table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowCopy {
    /// Reference the rows as they are.
    Adopt,
    /// Copy every row into a single new allocation.
    Block,
    /// Copy every row into its own allocation.
    PerRow,
}

/// Result of [`Array2d::set_focus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Unchanged,
    Moved,
}

#[derive(Debug)]
enum RowStorage {
    Borrowed(Vec<RowRef>),
    OwnedBlock {
        block: Block,
        stride: usize,
        rows: usize,
    },
    OwnedRows(Vec<Block>),
}

impl RowStorage {
    fn locate(&self, index: usize) -> Option<(&Block, usize)> {
        match self {
            Self::Borrowed(rows) => rows.get(index).map(|r| (&r.block, r.offset)),
            Self::OwnedBlock {
                block,
                stride,
                rows,
            } => (index < *rows).then(|| (block, index * stride)),
            Self::OwnedRows(rows) => rows.get(index).map(|b| (b, 0)),
        }
    }

    fn ownership(&self) -> RowOwnership {
        match self {
            Self::Borrowed(_) => RowOwnership::Borrowed,
            Self::OwnedBlock { .. } => RowOwnership::OwnedBlock,
            Self::OwnedRows(_) => RowOwnership::OwnedRows,
        }
    }

    fn blocks(&self) -> Vec<&Block> {
        match self {
            Self::Borrowed(rows) => rows.iter().map(|r| &r.block).collect(),
            Self::OwnedBlock { block, .. } => vec![block],
            Self::OwnedRows(rows) => rows.iter().collect(),
        }
    }
}

/// A 2D array of samples addressed by rows.
#[derive(Debug)]
pub struct Array2d {
    rows: RowStorage,
    reserved_width: usize,
    reserved_height: usize,
    origin_x: usize,
    origin_y: usize,
    width: usize,
    height: usize,
    data_type: DataType,
}

impl Array2d {
    /// Allocate a zeroed `width × height` sample array in one block.
    pub fn new(width: usize, height: usize, data_type: DataType) -> Result<Self, Array2dError> {
        Self::with_reserve(width, height, 0, 0, data_type)
    }

    /// Allocate a `width × height` window surrounded by reserve margins.
    ///
    /// The logical origin sits `margin_x` samples right of and `margin_y`
    /// rows below the start of the reservation.
    pub fn with_reserve(
        width: usize,
        height: usize,
        margin_x: usize,
        margin_y: usize,
        data_type: DataType,
    ) -> Result<Self, Array2dError> {
        let reserved_width = margin_x
            .checked_mul(2)
            .and_then(|m| m.checked_add(width));
        let reserved_height = margin_y
            .checked_mul(2)
            .and_then(|m| m.checked_add(height));
        let (Some(reserved_width), Some(reserved_height)) = (reserved_width, reserved_height)
        else {
            return Err(oversized(width, height, data_type));
        };
        let stride = checked_len(reserved_width, 1, data_type)?;
        let block = checked_len(reserved_width, reserved_height, data_type)
            .ok()
            .and_then(Block::try_zeroed)
            .ok_or_else(|| oversized(reserved_width, reserved_height, data_type))?;
        Ok(Self {
            rows: RowStorage::OwnedBlock {
                block,
                stride,
                rows: reserved_height,
            },
            reserved_width,
            reserved_height,
            origin_x: margin_x,
            origin_y: margin_y,
            width,
            height,
            data_type,
        })
    }

    /// Allocate zeroed rows individually, for arrays that are populated later.
    pub fn reserve_rows(
        width: usize,
        height: usize,
        data_type: DataType,
    ) -> Result<Self, Array2dError> {
        let len = checked_len(width, 1, data_type)?;
        // total size must be addressable even though rows are separate
        checked_len(width, height, data_type)?;
        let rows = (0..height)
            .map(|_| Block::try_zeroed(len).ok_or_else(|| oversized(width, height, data_type)))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            rows: RowStorage::OwnedRows(rows),
            ..Self::empty_shape(width, height, data_type)
        })
    }

    /// Stride rows over an existing block without copying.
    pub fn from_block(
        block: Block,
        width: usize,
        height: usize,
        data_type: DataType,
    ) -> Result<Self, Array2dError> {
        let stride = checked_len(width, 1, data_type)?;
        let expected = checked_len(width, height, data_type)?;
        let actual = block.len();
        if actual < expected {
            return Err(Array2dError::BufferTooSmall { expected, actual });
        }
        let rows = (0..height)
            .map(|y| RowRef::new(block.clone(), y * stride))
            .collect();
        Ok(Self {
            rows: RowStorage::Borrowed(rows),
            ..Self::empty_shape(width, height, data_type)
        })
    }

    /// Reference rows that live in other allocations.
    pub fn from_rows(
        rows: Vec<RowRef>,
        width: usize,
        height: usize,
        data_type: DataType,
    ) -> Result<Self, Array2dError> {
        check_rows(&rows, checked_len(width, 1, data_type)?, height)?;
        Ok(Self {
            rows: RowStorage::Borrowed(rows),
            ..Self::empty_shape(width, height, data_type)
        })
    }

    /// Copy `bytes` into a new array.
    pub fn from_bytes(
        bytes: &[u8],
        width: usize,
        height: usize,
        data_type: DataType,
    ) -> Result<Self, Array2dError> {
        let stride = checked_len(width, 1, data_type)?;
        let expected = checked_len(width, height, data_type)?;
        if bytes.len() < expected {
            return Err(Array2dError::BufferTooSmall {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            rows: RowStorage::OwnedBlock {
                block: Block::from_vec(bytes[..expected].to_vec()),
                stride,
                rows: height,
            },
            ..Self::empty_shape(width, height, data_type)
        })
    }

    fn empty_shape(width: usize, height: usize, data_type: DataType) -> Self {
        Self {
            rows: RowStorage::Borrowed(Vec::new()),
            reserved_width: width,
            reserved_height: height,
            origin_x: 0,
            origin_y: 0,
            width,
            height,
            data_type,
        }
    }

    /// Replace the row table.
    ///
    /// `rows` must cover the whole reservation. Rows owned before the call
    /// are released; the focus is kept.
    pub fn set_rows(&mut self, rows: Vec<RowRef>, mode: RowCopy) -> Result<(), Array2dError> {
        let row_len = self.reserved_width * self.sample_size();
        check_rows(&rows, row_len, self.reserved_height)?;

        self.rows = match mode {
            RowCopy::Adopt => RowStorage::Borrowed(rows),
            RowCopy::Block => {
                let mut bytes = Vec::with_capacity(row_len * rows.len());
                for row in &rows {
                    bytes.extend_from_slice(&row.copy_bytes(row_len)?);
                }
                RowStorage::OwnedBlock {
                    block: Block::from_vec(bytes),
                    stride: row_len,
                    rows: rows.len(),
                }
            }
            RowCopy::PerRow => RowStorage::OwnedRows(
                rows.iter()
                    .map(|row| row.copy_bytes(row_len).map(Block::from_vec))
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(())
    }

    /// Release all rows and start over with a zeroed `width × height` array.
    ///
    /// On error the array is left as it was.
    pub fn reset(
        &mut self,
        width: usize,
        height: usize,
        data_type: DataType,
    ) -> Result<(), Array2dError> {
        tracing::debug!("array reset to {width}x{height} {data_type}");
        *self = Self::new(width, height, data_type)?;
        Ok(())
    }

    /// Move the focus window.
    ///
    /// `focus` is given in reservation coordinates, where `(0, 0)` is the
    /// first sample of the first reserved row. Restoring a previously returned
    /// [`focus`](Self::focus) restores every row reference.
    pub fn set_focus(&mut self, focus: &Rectangle) -> Result<FocusChange, Array2dError> {
        let r = focus.rounded();
        let fits = r.x >= 0.0
            && r.y >= 0.0
            && r.width >= 0.0
            && r.height >= 0.0
            && r.x + r.width <= self.reserved_width as f64
            && r.y + r.height <= self.reserved_height as f64;
        if !fits {
            return Err(Array2dError::FocusOutsideDataArea {
                focus: *focus,
                data_area: self.data_area(),
            });
        }

        let next = (r.x as usize, r.y as usize, r.width as usize, r.height as usize);
        if next == (self.origin_x, self.origin_y, self.width, self.height) {
            return Ok(FocusChange::Unchanged);
        }
        tracing::trace!("array focus {} -> {}", self.focus(), r);
        (self.origin_x, self.origin_y, self.width, self.height) = next;
        Ok(FocusChange::Moved)
    }

    /// The active window in reservation coordinates.
    pub fn focus(&self) -> Rectangle {
        Rectangle::new(
            self.origin_x as f64,
            self.origin_y as f64,
            self.width as f64,
            self.height as f64,
        )
    }

    /// The whole reservation in logical coordinates.
    ///
    /// `x`/`y` are the negated focus origin, so reserve margins before the
    /// logical origin show up as negative offsets.
    pub fn data_area(&self) -> Rectangle {
        Rectangle::new(
            -(self.origin_x as f64),
            -(self.origin_y as f64),
            self.reserved_width as f64,
            self.reserved_height as f64,
        )
    }

    /// Active width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Active height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn reserved_width(&self) -> usize {
        self.reserved_width
    }

    pub fn reserved_height(&self) -> usize {
        self.reserved_height
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn sample_size(&self) -> usize {
        self.data_type.size()
    }

    pub fn ownership(&self) -> RowOwnership {
        self.rows.ownership()
    }

    /// Storage location of active sample `(row, col)`.
    ///
    /// `col` may equal the active width, which addresses the end of the row.
    pub fn address(&self, row: usize, col: usize) -> Result<RowRef, Array2dError> {
        if row >= self.height {
            return Err(Array2dError::RowOutOfRange {
                row,
                height: self.height,
            });
        }
        if col > self.width {
            return Err(Array2dError::SpanOutOfRange {
                col,
                len: 0,
                width: self.width,
            });
        }
        let reserved_row = self.origin_y + row;
        let (block, base) =
            self.rows
                .locate(reserved_row)
                .ok_or(Array2dError::RowOutOfRange {
                    row: reserved_row,
                    height: self.reserved_height,
                })?;
        let offset = base + (self.origin_x + col) * self.sample_size();
        Ok(RowRef::new(block.clone(), offset))
    }

    /// Start of active row `row`, if it exists.
    pub fn row_ref(&self, row: usize) -> Option<RowRef> {
        self.address(row, 0).ok()
    }

    fn span(&self, row: usize, col: usize, len: usize) -> Result<RowRef, Array2dError> {
        let sample_size = self.sample_size();
        if len % sample_size != 0 {
            return Err(Array2dError::PartialSample { len, sample_size });
        }
        let samples = len / sample_size;
        if col + samples > self.width {
            return Err(Array2dError::SpanOutOfRange {
                col,
                len: samples,
                width: self.width,
            });
        }
        self.address(row, col)
    }

    /// Copy `dst.len()` bytes starting at active sample `(row, col)`.
    pub fn read_row(&self, row: usize, col: usize, dst: &mut [u8]) -> Result<(), Array2dError> {
        let at = self.span(row, col, dst.len())?;
        let bytes = at.block.read();
        let end = at.offset + dst.len();
        if end > bytes.len() {
            return Err(Array2dError::BufferTooSmall {
                expected: end,
                actual: bytes.len(),
            });
        }
        dst.copy_from_slice(&bytes[at.offset..end]);
        Ok(())
    }

    /// Copy `src` into the row starting at active sample `(row, col)`.
    ///
    /// Storage is shared, so the write goes through the block lock and is
    /// visible to every array that references the same rows.
    pub fn write_row(&self, row: usize, col: usize, src: &[u8]) -> Result<(), Array2dError> {
        let at = self.span(row, col, src.len())?;
        let mut bytes = at.block.write();
        let end = at.offset + src.len();
        if end > bytes.len() {
            return Err(Array2dError::BufferTooSmall {
                expected: end,
                actual: bytes.len(),
            });
        }
        bytes[at.offset..end].copy_from_slice(src);
        Ok(())
    }

    /// Copy of the whole active row.
    pub fn row_bytes(&self, row: usize) -> Result<Vec<u8>, Array2dError> {
        let mut out = vec![0; self.width * self.sample_size()];
        self.read_row(row, 0, &mut out)?;
        Ok(out)
    }

    /// True when any row of `self` lives in an allocation `other` uses.
    pub fn shares_storage_with(&self, other: &Array2d) -> bool {
        let theirs = other.rows.blocks();
        self.rows
            .blocks()
            .iter()
            .any(|mine| theirs.iter().any(|t| Block::ptr_eq(mine, t)))
    }
}

fn oversized(width: usize, height: usize, data_type: DataType) -> Array2dError {
    Array2dError::Oversized {
        width,
        height,
        sample_size: data_type.size(),
    }
}

/// Byte size of `width × height` samples, if it fits in `usize`.
fn checked_len(width: usize, height: usize, data_type: DataType) -> Result<usize, Array2dError> {
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(data_type.size()))
        .ok_or_else(|| oversized(width, height, data_type))
}

fn check_rows(rows: &[RowRef], row_len: usize, height: usize) -> Result<(), Array2dError> {
    if rows.len() != height {
        return Err(Array2dError::RowCount {
            expected: height,
            actual: rows.len(),
        });
    }
    for row in rows {
        let actual = row.block.len();
        let expected = row.offset + row_len;
        if actual < expected {
            return Err(Array2dError::BufferTooSmall { expected, actual });
        }
    }
    Ok(())
}

/// Shared handle to an [`Array2d`].
///
/// Cloning acquires another reference; dropping releases it.
#[derive(Debug, Clone)]
pub struct ArrayHandle(Arc<RwLock<Array2d>>);

impl ArrayHandle {
    pub fn new(array: Array2d) -> Self {
        Self(Arc::new(RwLock::new(array)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Array2d> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Array2d> {
        self.0.write()
    }

    pub fn ptr_eq(a: &ArrayHandle, b: &ArrayHandle) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl From<Array2d> for ArrayHandle {
    fn from(array: Array2d) -> Self {
        Self::new(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: usize, height: usize) -> Array2d {
        let bytes: Vec<u8> = (0..width * height).map(|i| i as u8).collect();
        Array2d::from_bytes(&bytes, width, height, DataType::U8).unwrap()
    }

    #[test]
    fn test_new_reports_shape() {
        let a = Array2d::new(7, 3, DataType::F32).unwrap();
        assert_eq!(a.width(), 7);
        assert_eq!(a.height(), 3);
        assert_eq!(a.data_type(), DataType::F32);
        assert_eq!(a.ownership(), RowOwnership::OwnedBlock);
        assert_eq!(a.data_area(), Rectangle::new(0.0, 0.0, 7.0, 3.0));
    }

    #[test]
    fn test_focus_restore_restores_row_identity() {
        let mut a = Array2d::new(6, 4, DataType::U16).unwrap();
        let original = a.data_area();
        let before = a.row_ref(0).unwrap();

        let change = a.set_focus(&Rectangle::new(2.0, 1.0, 3.0, 2.0)).unwrap();
        assert_eq!(change, FocusChange::Moved);
        assert_eq!(a.width(), 3);
        assert_eq!(a.height(), 2);
        assert_ne!(a.row_ref(0).unwrap(), before);
        assert_eq!(a.data_area(), Rectangle::new(-2.0, -1.0, 6.0, 4.0));

        assert_eq!(a.set_focus(&original).unwrap(), FocusChange::Moved);
        assert_eq!(a.row_ref(0).unwrap(), before);
        assert_eq!(a.set_focus(&original).unwrap(), FocusChange::Unchanged);
    }

    #[test]
    fn test_focus_outside_reservation_fails() {
        let mut a = Array2d::new(4, 4, DataType::U8).unwrap();
        let err = a.set_focus(&Rectangle::new(2.0, 0.0, 3.0, 1.0)).unwrap_err();
        assert!(matches!(err, Array2dError::FocusOutsideDataArea { .. }));
        assert!(a.set_focus(&Rectangle::new(-1.0, 0.0, 1.0, 1.0)).is_err());
        // unchanged after the failed call
        assert_eq!(a.focus(), Rectangle::new(0.0, 0.0, 4.0, 4.0));
    }

    #[test]
    fn test_focus_addresses_reservation() {
        let mut a = filled(4, 3);
        a.set_focus(&Rectangle::new(1.0, 1.0, 2.0, 2.0)).unwrap();
        assert_eq!(a.row_bytes(0).unwrap(), vec![5, 6]);
        assert_eq!(a.row_bytes(1).unwrap(), vec![9, 10]);
        assert!(a.row_bytes(2).is_err());
    }

    #[test]
    fn test_reserve_margins_show_as_negative_data_area() {
        let a = Array2d::with_reserve(4, 2, 2, 1, DataType::U8).unwrap();
        assert_eq!(a.data_area(), Rectangle::new(-2.0, -1.0, 8.0, 4.0));
        assert_eq!(a.focus(), Rectangle::new(2.0, 1.0, 4.0, 2.0));
        assert_eq!(a.row_ref(0).unwrap().offset(), 8 + 2);
    }

    #[test]
    fn test_from_block_borrows_storage() {
        let block = Block::zeroed(12);
        let a = Array2d::from_block(block.clone(), 3, 2, DataType::U16).unwrap();
        assert_eq!(a.ownership(), RowOwnership::Borrowed);
        a.write_row(1, 1, &[0xAA, 0xBB]).unwrap();
        assert_eq!(block.read()[8..10], [0xAA, 0xBB]);
    }

    #[test]
    fn test_from_block_rejects_short_buffer() {
        let err = Array2d::from_block(Block::zeroed(5), 3, 2, DataType::U8).unwrap_err();
        assert!(matches!(
            err,
            Array2dError::BufferTooSmall {
                expected: 6,
                actual: 5
            }
        ));
    }

    #[test]
    fn test_set_rows_copy_modes() {
        let source = filled(3, 2);
        let rows: Vec<RowRef> = (0..2).map(|y| source.row_ref(y).unwrap()).collect();

        let mut adopted = Array2d::new(3, 2, DataType::U8).unwrap();
        adopted.set_rows(rows.clone(), RowCopy::Adopt).unwrap();
        assert_eq!(adopted.ownership(), RowOwnership::Borrowed);
        assert!(adopted.shares_storage_with(&source));

        let mut block = Array2d::new(3, 2, DataType::U8).unwrap();
        block.set_rows(rows.clone(), RowCopy::Block).unwrap();
        assert_eq!(block.ownership(), RowOwnership::OwnedBlock);
        assert!(!block.shares_storage_with(&source));
        assert_eq!(block.row_bytes(1).unwrap(), vec![3, 4, 5]);

        let mut per_row = Array2d::new(3, 2, DataType::U8).unwrap();
        per_row.set_rows(rows, RowCopy::PerRow).unwrap();
        assert_eq!(per_row.ownership(), RowOwnership::OwnedRows);
        assert!(!per_row.shares_storage_with(&source));
        assert_eq!(per_row.row_bytes(0).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_set_rows_checks_row_count() {
        let source = filled(3, 2);
        let mut a = Array2d::new(3, 3, DataType::U8).unwrap();
        let err = a
            .set_rows(vec![source.row_ref(0).unwrap()], RowCopy::Adopt)
            .unwrap_err();
        assert!(matches!(err, Array2dError::RowCount { expected: 3, actual: 1 }));
    }

    #[test]
    fn test_reserve_rows_is_zeroed_per_row_storage() {
        let a = Array2d::reserve_rows(4, 3, DataType::U16).unwrap();
        assert_eq!(a.ownership(), RowOwnership::OwnedRows);
        assert_eq!(a.row_bytes(2).unwrap(), vec![0; 8]);
    }

    #[test]
    fn test_reset_reinitializes_data_area() {
        let mut a = Array2d::with_reserve(2, 2, 1, 1, DataType::U8).unwrap();
        a.reset(5, 1, DataType::F64).unwrap();
        assert_eq!(a.data_area(), Rectangle::new(0.0, 0.0, 5.0, 1.0));
        assert_eq!(a.data_type(), DataType::F64);
        assert_eq!(a.row_bytes(0).unwrap().len(), 40);
    }

    #[test]
    fn test_span_checks() {
        let a = Array2d::new(2, 1, DataType::U16).unwrap();
        assert!(matches!(
            a.write_row(0, 1, &[0; 4]).unwrap_err(),
            Array2dError::SpanOutOfRange { .. }
        ));
        assert!(matches!(
            a.write_row(0, 0, &[0; 3]).unwrap_err(),
            Array2dError::PartialSample { .. }
        ));
    }

    #[test]
    fn test_oversized_allocation_is_an_error() {
        let huge = 1usize << 40;
        for err in [
            Array2d::new(huge, huge, DataType::U16).unwrap_err(),
            Array2d::with_reserve(usize::MAX, 1, 1, 0, DataType::U8).unwrap_err(),
            Array2d::reserve_rows(huge, huge, DataType::F64).unwrap_err(),
        ] {
            assert!(matches!(err, Array2dError::Oversized { .. }));
            assert_eq!(err.severity(), crate::error::Severity::Hard);
        }

        let mut a = Array2d::new(2, 2, DataType::U8).unwrap();
        assert!(a.reset(huge, huge, DataType::F32).is_err());
        assert_eq!(a.data_area(), Rectangle::new(0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn test_handle_identity() {
        let a = ArrayHandle::new(Array2d::new(1, 1, DataType::U8).unwrap());
        let b = a.clone();
        let c = ArrayHandle::new(Array2d::new(1, 1, DataType::U8).unwrap());
        assert!(ArrayHandle::ptr_eq(&a, &b));
        assert!(!ArrayHandle::ptr_eq(&a, &c));
    }
}
