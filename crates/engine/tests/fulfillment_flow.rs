use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use wareflow_catalog::{Brand, ContactInfo, Dimensions, NewProduct};
use wareflow_core::{DomainError, UserId};
use wareflow_engine::{
    AssignRoute, BlindCount, CompleteRoute, CreateOrder, CreateReceptionOrder, Engine,
    EngineConfig, EngineError, InMemoryAuditSink, OrderCommand, PreDepartureCheck,
    ReceptionCommand, RegisterCustomer, RegisterDriver, RegisterProduct, RegisterSupplier,
    RegisterVehicle, RequestedLine, RouteCommand, Stores,
};
use wareflow_fleet::{
    DepartureReadings, NewVehicle, OilLevel, RouteSchedule, RouteStatus, RouteType, TireCondition,
};
use wareflow_inventory::{MovementType, Reservation, replay_quantity};
use wareflow_orders::{OrderStatus, VehicleClass};
use wareflow_reception::{LineCount, NewReceptionLine, ReceptionStatus};

#[test]
fn inbound_stock_ships_to_a_customer() {
    let audit = Arc::new(InMemoryAuditSink::new());
    let engine = Engine::new(Stores::in_memory(), audit.clone(), EngineConfig::default());
    let clerk = UserId::new();
    let at = Utc.with_ymd_and_hms(2026, 5, 11, 8, 30, 0).unwrap();
    let today = at.date_naive();

    let supplier = engine
        .register_supplier(RegisterSupplier {
            name: "Conservas del Norte".into(),
            brand: Brand::new("la costena").unwrap(),
            tax_id: "CDN-010101".into(),
            contact: ContactInfo::default(),
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    let chiles = engine
        .register_product(RegisterProduct {
            product: NewProduct {
                sku: "COS-CHI-220".into(),
                name: "Chiles jalapenos 220g".into(),
                brand: Brand::new("la costena").unwrap(),
                category: "enlatados".into(),
                barcode: Some("7501017004012".into()),
                dimensions: Dimensions::new(40.0, 30.0, 25.0).unwrap(),
                weight_kg: 12.0,
                is_fragile: true,
                unit_price: 42_000,
            },
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    let customer = engine
        .register_customer(RegisterCustomer {
            name: "Abarrotes Lupita".into(),
            tax_id: "ALU-990101".into(),
            address: "Av. Juarez 12".into(),
            contact: ContactInfo::default(),
            credit_limit: 5_000_000,
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();

    // Receiving: two dated lots, counted blind, validated into stock.
    let reception = engine
        .create_reception_order(CreateReceptionOrder {
            supplier_id: supplier.id,
            invoice_ref: "FAC-88121".into(),
            notes: None,
            lines: vec![
                NewReceptionLine {
                    product_id: chiles.id,
                    expected_quantity: 40,
                    lot_number: Some("CHI-2605-A".into()),
                    expiration_date: Some(today + Duration::days(45)),
                    location: Some("R-01-A".into()),
                },
                NewReceptionLine {
                    product_id: chiles.id,
                    expected_quantity: 60,
                    lot_number: Some("CHI-2605-B".into()),
                    expiration_date: Some(today + Duration::days(180)),
                    location: Some("R-01-B".into()),
                },
            ],
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    let counted = engine
        .blind_count(BlindCount {
            order_id: reception.id,
            counts: reception
                .lines
                .iter()
                .map(|line| LineCount {
                    line_id: line.id,
                    counted_quantity: line.expected_quantity,
                    condition: None,
                })
                .collect(),
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    assert_eq!(counted.status, ReceptionStatus::Counting);
    let validated = engine
        .validate_reception(ReceptionCommand {
            order_id: reception.id,
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    let [soon, later] = [&validated.lots[0], &validated.lots[1]];

    // Outbound: 30 units fit in the earliest-expiring lot.
    let order = engine
        .create_order(CreateOrder {
            customer_id: customer.id,
            lines: vec![RequestedLine {
                product_id: chiles.id,
                quantity: 30,
            }],
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    assert_eq!(order.lines[0].reservation, Reservation::Reserved { lot_id: soon.id });
    assert!(order.has_fragile_items);
    assert!(order.has_heavy_items);
    assert!(order.loading_alert.is_some());
    assert_eq!(order.suggested_vehicle, VehicleClass::Van);

    let cmd = OrderCommand {
        order_id: order.id,
        actor: clerk,
        occurred_at: at,
    };
    engine.confirm_order(cmd).unwrap();
    engine.start_preparation(cmd).unwrap();
    engine.mark_ready(cmd).unwrap();

    // Fleet: a van and a driver, picked automatically.
    let van = engine
        .register_vehicle(RegisterVehicle {
            vehicle: NewVehicle {
                plate_number: "nlx-4821".into(),
                class: VehicleClass::Van,
                make: Some("Nissan".into()),
                model: Some("NV350".into()),
                year: Some(2021),
                capacity_kg: 1_200.0,
                capacity_m3: 10.0,
            },
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    assert_eq!(van.plate_number, "NLX-4821");
    engine
        .register_driver(RegisterDriver {
            name: "Rosa Medina".into(),
            license_number: "NL-778812".into(),
            license_expiry: today + Duration::days(400),
            phone: None,
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();

    let assignment = engine
        .assign_route(AssignRoute {
            order_id: order.id,
            vehicle_id: None,
            driver_id: None,
            schedule: RouteSchedule {
                route_type: RouteType::Local,
                departure: at + Duration::hours(1),
                estimated_arrival: at + Duration::hours(3),
            },
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    assert!(assignment.auto_assigned);
    assert_eq!(assignment.route.order_status_before, OrderStatus::Ready);

    let unsafe_departure = engine.perform_pre_departure_check(PreDepartureCheck {
        route_id: assignment.route.id,
        readings: DepartureReadings {
            tire_condition: TireCondition::Bad,
            fuel_level: 80,
            oil_level: OilLevel::Ok,
            lights_ok: true,
            damage_photo_ref: None,
            notes: None,
        },
        actor: clerk,
        occurred_at: at,
    });
    assert!(matches!(
        unsafe_departure,
        Err(EngineError::Domain(DomainError::SafetyViolation(_)))
    ));
    engine
        .perform_pre_departure_check(PreDepartureCheck {
            route_id: assignment.route.id,
            readings: DepartureReadings {
                tire_condition: TireCondition::Fair,
                fuel_level: 80,
                oil_level: OilLevel::Low,
                lights_ok: true,
                damage_photo_ref: None,
                notes: Some("oil topped up at next stop".into()),
            },
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();

    let invoice = engine
        .generate_invoice_reference(RouteCommand {
            route_id: assignment.route.id,
            actor: clerk,
            occurred_at: at,
        })
        .unwrap();
    assert_eq!(
        invoice,
        format!("/invoices/invoice_{}_20260511.pdf", assignment.route.route_number)
    );

    let delivered = engine
        .complete_route(CompleteRoute {
            route_id: assignment.route.id,
            actual_arrival: at + Duration::hours(3),
            actor: clerk,
            occurred_at: at + Duration::hours(3),
        })
        .unwrap();
    assert_eq!(delivered.status, RouteStatus::Delivered);
    assert_eq!(engine.order(order.id).unwrap().status, OrderStatus::Delivered);

    // Ledger: every lot replays to its quantity.
    for lot in [soon, later] {
        let stored = engine.stores().inventory.lot(lot.id).unwrap().unwrap();
        let movements = engine.lot_movements(lot.id).unwrap();
        assert_eq!(replay_quantity(&movements), stored.quantity);
        assert_eq!(movements[0].movement_type, MovementType::In);
    }
    assert_eq!(
        engine.stores().inventory.aggregate_stock(chiles.id).unwrap(),
        70
    );
    assert!(audit.actions().iter().any(|a| a == "ASSIGN_ROUTE"));
}
