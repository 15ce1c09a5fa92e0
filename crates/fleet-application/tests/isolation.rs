//! Tenant isolation across concurrently served requests.

mod common;

use std::sync::Arc;

use common::*;
use futures::future::join_all;
use fleet_application::{CreateVehicle, DeleteVehicle, GetVehicle, GetVehicles, UpdateVehicle, VehicleType};
use tenancy_core::{FailureKind, TenantContext};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_share_tenant_context() {
    let (source, runtime) = memory_runtime(2);
    // 11 and 12 share shard 2; 21 is alone on shard 1.
    let tenants = [(11, 2), (12, 2), (21, 1)];
    for (id, shard) in tenants {
        seed_tenant(&source, id, shard, &format!("user{}", id));
    }
    let runtime = Arc::new(runtime);

    let tasks = (0..30).map(|i| {
        let runtime = runtime.clone();
        let (tenant, shard) = tenants[i % tenants.len()];
        tokio::spawn(async move {
            runtime
                .run_as(&tenant.to_string(), async {
                    tokio::task::yield_now().await;
                    assert_eq!(TenantContext::current(), TenantContext::resolved(tenant, shard));
                    let created = runtime
                        .dispatcher()
                        .dispatch(CreateVehicle::new(VehicleType::Car, format!("T{}-{}", tenant, i)))
                        .await
                        .unwrap();
                    assert!(created.is_success());
                    assert_eq!(TenantContext::current(), TenantContext::resolved(tenant, shard));
                })
                .await
                .unwrap();
        })
    });
    for joined in join_all(tasks).await {
        joined.unwrap();
    }

    for (tenant, _) in tenants {
        let page = runtime
            .run_as(&tenant.to_string(), runtime.dispatcher().query(GetVehicles::default().page(1, 100)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.total_count, 10);
        assert!(page.items.iter().all(|v| v.person_id == tenant));
        assert!(page.items.iter().all(|v| v.license_plate.starts_with(&format!("T{}-", tenant))));
    }

    let shard2 = shard_store(&source, 2).rows("vehicles");
    assert_eq!(shard2.len(), 20);
    assert!(shard2.iter().all(|row| row.owner_id == Some(11) || row.owner_id == Some(12)));
    assert_eq!(shard_store(&source, 1).row_count("vehicles"), 10);
}

#[tokio::test]
async fn test_foreign_vehicle_cannot_be_read_or_changed_by_id() {
    let (source, runtime) = memory_runtime(1);
    seed_tenant(&source, 42, 1, "alice");
    seed_tenant(&source, 7, 1, "bob");

    runtime
        .run_as("42", runtime.dispatcher().dispatch(CreateVehicle::new(VehicleType::Truck, "AB-1")))
        .await
        .unwrap()
        .unwrap();
    let vehicle_id = shard_store(&source, 1).rows("vehicles")[0].id;

    let read = runtime
        .run_as("7", runtime.dispatcher().query(GetVehicle { id: vehicle_id }))
        .await
        .unwrap()
        .unwrap();
    assert!(read.is_none());

    let update = runtime
        .run_as(
            "7",
            runtime.dispatcher().dispatch(UpdateVehicle {
                id: vehicle_id,
                vehicle_type: VehicleType::Bus,
                license_plate: "HIJACKED".into(),
            }),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.failure_kind(), Some(FailureKind::NotFound));

    let delete = runtime
        .run_as("7", runtime.dispatcher().dispatch(DeleteVehicle::new(vehicle_id)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delete.failure_kind(), Some(FailureKind::NotFound));

    let row = &shard_store(&source, 1).rows("vehicles")[0];
    assert_eq!(row.body["license_plate"], "AB-1");
    assert_eq!(row.body["is_deleted"], false);

    let own = runtime
        .run_as("42", runtime.dispatcher().query(GetVehicle { id: vehicle_id }))
        .await
        .unwrap()
        .unwrap()
        .expect("owner still sees the vehicle");
    assert_eq!(own.vehicle_type, VehicleType::Truck);
}
