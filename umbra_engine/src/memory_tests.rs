/// Tests for memory type selection

use super::*;

fn table() -> MemoryProperties {
    MemoryProperties {
        memory_types: vec![
            MemoryType { property_flags: MemoryPropertyFlags::DEVICE_LOCAL, heap_index: 0 },
            MemoryType {
                property_flags: MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
                heap_index: 1,
            },
            MemoryType {
                property_flags: MemoryPropertyFlags::DEVICE_LOCAL
                    | MemoryPropertyFlags::HOST_VISIBLE
                    | MemoryPropertyFlags::HOST_COHERENT,
                heap_index: 0,
            },
        ],
    }
}

// ============================================================================
// Tests: find_memory_type_index
// ============================================================================

#[test]
fn test_selects_first_matching_type() {
    let index = find_memory_type_index(&table(), 0b111, MemoryPropertyFlags::DEVICE_LOCAL);
    assert_eq!(index, Some(0));
}

#[test]
fn test_respects_type_bits() {
    // Type 0 excluded by the resource requirements
    let index = find_memory_type_index(&table(), 0b110, MemoryPropertyFlags::DEVICE_LOCAL);
    assert_eq!(index, Some(2));
}

#[test]
fn test_requires_all_flags() {
    let host = MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT;
    assert_eq!(find_memory_type_index(&table(), 0b111, host), Some(1));
    assert_eq!(
        find_memory_type_index(&table(), 0b111, host | MemoryPropertyFlags::DEVICE_LOCAL),
        Some(2)
    );
}

#[test]
fn test_no_match_returns_none() {
    assert_eq!(find_memory_type_index(&table(), 0b001, MemoryPropertyFlags::HOST_VISIBLE), None);
    assert_eq!(find_memory_type_index(&table(), 0, MemoryPropertyFlags::empty()), None);
    assert_eq!(
        find_memory_type_index(&table(), 0b111, MemoryPropertyFlags::HOST_CACHED),
        None
    );
}

#[test]
fn test_empty_requirement_matches_any_allowed_type() {
    assert_eq!(find_memory_type_index(&table(), 0b100, MemoryPropertyFlags::empty()), Some(2));
}

#[test]
fn test_memory_type_index_error() {
    assert_eq!(table().memory_type_index(0b010, MemoryPropertyFlags::HOST_VISIBLE), Ok(1));
    assert!(table().memory_type_index(0b001, MemoryPropertyFlags::HOST_VISIBLE).is_err());
}
