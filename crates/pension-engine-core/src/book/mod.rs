pub mod kpis;
