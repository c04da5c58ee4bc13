use super::*;
use futures::StreamExt;
use pcbook_tonic_core::{
    pcbook::{Cpu, InMemoryBlobStore, InMemoryInventoryStore, InMemoryRatingStore, Laptop, Memory, MemoryUnit},
    proto,
    types::GRPC_TIMEOUT_HEADER,
};
use tonic::{Code, metadata::MetadataValue};

type TestService = InventoryService<InMemoryInventoryStore, InMemoryRatingStore>;

fn service() -> TestService {
    InventoryService::new(
        Arc::new(InMemoryInventoryStore::new()),
        Arc::new(InMemoryRatingStore::new()),
        Arc::new(InMemoryBlobStore::new()),
        ServerConfig::default(),
    )
}

fn laptop(id: &str, price_usd: f64) -> proto::Laptop {
    Laptop {
        id: id.to_string(),
        brand: "Dell".to_string(),
        name: "XPS".to_string(),
        cpu: Cpu {
            number_cores: 8,
            number_threads: 16,
            min_ghz: 3.0,
            max_ghz: 4.5,
            ..Cpu::default()
        },
        ram: Memory::new(32, MemoryUnit::Gigabyte),
        price_usd,
        ..Laptop::default()
    }
    .into()
}

async fn create(service: &TestService, laptop: proto::Laptop) -> Result<String, Status> {
    let req = Request::new(CreateLaptopRequest {
        laptop: Some(laptop),
    });
    Ok(service.create_laptop(req).await?.into_inner().id)
}

fn affordable() -> proto::Filter {
    Filter {
        max_price_usd: 2000.0,
        min_cpu_cores: 4,
        min_cpu_ghz: 2.0,
        min_ram: Memory::new(8, MemoryUnit::Gigabyte),
    }
    .into()
}

#[tokio::test]
async fn create_mints_and_keeps_ids() {
    let service = service();

    let minted = create(&service, laptop("", 1000.0)).await.unwrap();
    assert!(!minted.is_empty());

    let supplied = "2f5d4a3e-96a4-4c41-9d0b-3f1c2b2f7a10";
    assert_eq!(create(&service, laptop(supplied, 1000.0)).await.unwrap(), supplied);
}

#[tokio::test]
async fn create_rejects_bad_requests() {
    let service = service();

    let missing = service
        .create_laptop(Request::new(CreateLaptopRequest { laptop: None }))
        .await
        .unwrap_err();
    assert_eq!(missing.code(), Code::InvalidArgument);

    let malformed = create(&service, laptop("not-a-uuid", 1000.0)).await.unwrap_err();
    assert_eq!(malformed.code(), Code::InvalidArgument);

    let id = create(&service, laptop("", 1000.0)).await.unwrap();
    let duplicate = create(&service, laptop(&id, 1000.0)).await.unwrap_err();
    assert_eq!(duplicate.code(), Code::AlreadyExists);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_streams_matches() {
    let service = service();
    let cheap = create(&service, laptop("", 1500.0)).await.unwrap();
    create(&service, laptop("", 3500.0)).await.unwrap();

    let req = Request::new(SearchLaptopRequest {
        filter: Some(affordable()),
    });
    let stream = service.search_laptop(req).await.unwrap().into_inner();
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 1);
    let found = items[0].as_ref().unwrap().laptop.as_ref().unwrap();
    assert_eq!(found.id, cheap);
    assert_eq!(found.price_usd, 1500.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn search_honours_the_callers_deadline() {
    let service = service();
    create(&service, laptop("", 1500.0)).await.unwrap();

    let mut req = Request::new(SearchLaptopRequest {
        filter: Some(affordable()),
    });
    req.metadata_mut()
        .insert(GRPC_TIMEOUT_HEADER, MetadataValue::from_static("1n"));
    let stream = service.search_laptop(req).await.unwrap().into_inner();
    let items: Vec<_> = stream.collect().await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap_err().code(), Code::DeadlineExceeded);
}

#[tokio::test]
async fn shutdown_refuses_new_calls() {
    let service = service();
    service.shutdown().await;

    let err = create(&service, laptop("", 1000.0)).await.unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);

    let err = service
        .search_laptop(Request::new(SearchLaptopRequest { filter: None }))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), Code::Unavailable);
}

#[tokio::test(flavor = "multi_thread")]
async fn finished_calls_release_their_slot() {
    let service = service();
    create(&service, laptop("", 1500.0)).await.unwrap();

    let req = Request::new(SearchLaptopRequest {
        filter: Some(affordable()),
    });
    let stream = service.search_laptop(req).await.unwrap().into_inner();
    let _: Vec<_> = stream.collect().await;

    // Once the stream has ended the worker is gone, so shutdown drains at once.
    tokio::time::timeout(core::time::Duration::from_secs(1), service.shutdown())
        .await
        .unwrap();
}
