use lodview_core::prelude::*;
use lodview_storage::prelude::*;

use futures::executor::block_on;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use utilities::data_sets::{ramp_image, ramp_value, PyramidParams, PADDING_VALUE};

/// Checks every pixel of a single-component `image` against the ramp at `scale`, where the image starts at index `min`.
fn assert_ramp(image: &AssembledImage, scale: usize, min: [i64; 3]) {
    let size: Vec<i64> = (0..3).map(|i| image.size.get(i).copied().unwrap_or(1) as i64).collect();
    let mut i = 0;
    for z in 0..size[2] {
        for y in 0..size[1] {
            for x in 0..size[0] {
                let p = AxisMap([0, min[0] + x, min[1] + y, min[2] + z, 0]);
                let actual = image.data.get_f64(i).unwrap();
                assert_ne!(actual, PADDING_VALUE as f64);
                assert_eq!(actual, ramp_value(scale, &p) as f64, "at {:?}", p);
                i += 1;
            }
        }
    }
    assert_eq!(i, image.data.len());
}

#[test]
fn full_image_at_coarse_scale() {
    let (image, stats) = ramp_image(&PyramidParams::default(), AccessorConfig::default());

    let assembled = block_on(image.get_image(2, None)).unwrap();

    assert_eq!(assembled.size, vec![16, 16, 16]);
    assert_eq!(assembled.origin, vec![0.0, 0.0, 0.0]);
    assert_eq!(assembled.spacing, vec![4.0, 4.0, 4.0]);
    assert_eq!(assembled.direction, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
    assert_eq!(assembled.name, "ramp_s2");
    assert_ramp(&assembled, 2, [0, 0, 0]);
    assert_eq!(stats.batches(), 1);
}

#[test]
fn region_crosses_chunk_boundaries() {
    let (image, stats) = ramp_image(&PyramidParams::default(), AccessorConfig::default());
    let bounds = WorldBounds::from_flat([10.0, 30.0, 0.0, 16.0, 20.0, 21.0]);

    let assembled = block_on(image.get_image(0, Some(&bounds))).unwrap();

    assert_eq!(assembled.size, vec![20, 16, 1]);
    assert_eq!(assembled.origin, vec![10.0, 0.0, 20.0]);
    assert_ramp(&assembled, 0, [10, 0, 20]);
    // x chunks [0, 2), one y chunk, one z chunk.
    assert_eq!(stats.chunks(), 2);
}

#[test]
fn boundary_chunks_are_cropped_to_the_array() {
    let params = PyramidParams {
        shape: [40, 20, 10],
        ..Default::default()
    };
    let (image, _) = ramp_image(&params, AccessorConfig::default());

    let assembled = block_on(image.get_image(0, None)).unwrap();

    assert_eq!(assembled.size, vec![40, 20, 10]);
    assert_ramp(&assembled, 0, [0, 0, 0]);
}

#[test]
fn identical_requests_hit_the_cache() {
    let (image, stats) = ramp_image(&PyramidParams::default(), AccessorConfig::default());
    let bounds = WorldBounds::from_flat([0.0, 20.0, 0.0, 20.0, 0.0, 20.0]);
    // Selects the same elements after flooring and ceiling.
    let nearby = WorldBounds::from_flat([0.2, 19.5, 0.0, 19.9, 0.1, 20.0]);

    let first = block_on(image.get_image(0, Some(&bounds))).unwrap();
    let second = block_on(image.get_image(0, Some(&bounds))).unwrap();
    let third = block_on(image.get_image(0, Some(&nearby))).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(stats.batches(), 1);
    assert_eq!(image.cache_len(), 1);
}

#[test]
fn concurrent_requests_share_one_fetch() {
    let (image, stats) = ramp_image(&PyramidParams::default(), AccessorConfig::default());
    stats.set_pend_once(true);

    let (a, b) = block_on(futures::future::join(image.get_image(1, None), image.get_image(1, None)));

    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(stats.batches(), 1);
}

#[test]
fn voxel_budget_is_checked_before_fetching() {
    let config = AccessorConfig {
        max_voxels: 1000,
        ..Default::default()
    };
    let (image, stats) = ramp_image(&PyramidParams::default(), config);

    let result = block_on(image.get_image(0, None));

    assert!(matches!(
        result,
        Err(AccessError::VoxelBudgetExceeded {
            scale: 0,
            requested: 262_144,
            limit: 1000
        })
    ));
    assert_eq!(stats.batches(), 0);

    // A small enough region still works.
    let bounds = WorldBounds::from_flat([0.0, 8.0, 0.0, 8.0, 0.0, 8.0]);
    assert!(block_on(image.get_image(0, Some(&bounds))).is_ok());
}

#[test]
fn failures_are_not_cached() {
    let (image, stats) = ramp_image(&PyramidParams::default(), AccessorConfig::default());

    stats.set_failing(true);
    assert!(matches!(block_on(image.get_image(2, None)), Err(AccessError::Fetch(_))));
    assert_eq!(image.cache_len(), 0);

    stats.set_failing(false);
    assert!(block_on(image.get_image(2, None)).is_ok());
    assert_eq!(stats.batches(), 2);
    assert_eq!(image.cache_len(), 1);
}

#[test]
fn cache_evicts_least_recently_used() {
    let config = AccessorConfig {
        cache_capacity: 2,
        ..Default::default()
    };
    let (image, stats) = ramp_image(&PyramidParams::default(), config);

    let first = block_on(image.get_image(2, None)).unwrap();
    block_on(image.get_image(1, None)).unwrap();
    block_on(image.get_image(0, Some(&WorldBounds::from_flat([0.0, 4.0, 0.0, 4.0, 0.0, 4.0])))).unwrap();
    assert_eq!(image.cache_len(), 2);

    // Scale 2 was evicted, so it is fetched again.
    let again = block_on(image.get_image(2, None)).unwrap();
    assert!(!Arc::ptr_eq(&first, &again));
    assert_eq!(stats.batches(), 4);
}

#[test]
fn worker_pool_assembles_the_same_pixels() {
    let params = PyramidParams::default();
    let (inline, _) = ramp_image(
        &params,
        AccessorConfig {
            assembly_threads: 0,
            ..Default::default()
        },
    );
    let (pooled, _) = ramp_image(
        &params,
        AccessorConfig {
            assembly_threads: 2,
            ..Default::default()
        },
    );

    let a = block_on(inline.get_image(1, None)).unwrap();
    let b = block_on(pooled.get_image(1, None)).unwrap();

    assert_eq!(*a, *b);
}

#[test]
fn planar_image_interleaves_components() {
    let params = PyramidParams {
        dimension: 2,
        shape: [8, 4, 1],
        chunk_shape: [4, 4, 1],
        components: 2,
        num_scales: 1,
        spacing: 0.5,
    };
    let (image, _) = ramp_image(&params, AccessorConfig::default());

    let assembled = block_on(image.get_image(0, None)).unwrap();

    assert_eq!(assembled.size, vec![8, 4]);
    assert_eq!(assembled.spacing, vec![0.5, 0.5]);
    assert_eq!(assembled.direction, vec![1.0, 0.0, 0.0, 1.0]);
    assert_eq!(assembled.data.len(), 8 * 4 * 2);
    // Pixel (x = 3, y = 2).
    let pixel = (2 * 8 + 3) * 2;
    assert_eq!(assembled.data.get_f64(pixel), Some(23.0));
    assert_eq!(assembled.data.get_f64(pixel + 1), Some(1023.0));
    assert_eq!(assembled.component_ranges(), vec![[0.0, 37.0], [1000.0, 1037.0]]);
    assert_eq!(assembled.world_bounds().to_flat(), [0.0, 4.0, 0.0, 2.0, 0.0, 1.0]);
}

#[test]
fn level_metadata() {
    let (image, _) = ramp_image(&PyramidParams::default(), AccessorConfig::default());

    assert_eq!(image.num_scales(), 3);
    assert_eq!(image.lowest_scale(), 2);
    assert_eq!(image.voxel_count(1), 32 * 32 * 32);
    assert_eq!(image.value_ranges(0), None);
    assert_eq!(image.image_meta(1), None);

    assert_eq!(block_on(image.scale_spacing(1)), vec![2.0, 2.0, 2.0]);
    assert_eq!(block_on(image.scale_origin(1)), vec![0.0, 0.0, 0.0]);
    let meta = image.image_meta(1).unwrap();
    assert_eq!(meta.size, vec![32, 32, 32]);
    assert_eq!(meta.name, "ramp_s1");
    assert_eq!(block_on(image.world_bounds(1)).to_flat(), [0.0, 64.0, 0.0, 64.0, 0.0, 64.0]);
}

#[test]
#[should_panic]
fn scale_out_of_range_panics() {
    let (image, _) = ramp_image(&PyramidParams::default(), AccessorConfig::default());

    let _ = block_on(image.get_image(3, None));
}
